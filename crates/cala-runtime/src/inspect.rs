//! Static checks of a compiled module against the bridge.

use crate::bridge;
use crate::error::{LoadError, LoadResult};
use crate::loader::LoaderConfig;
use serde::Serialize;
use wasmtime::{ExternType, Module};

/// One import of the module and whether the bridge defines it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub module: String,
    pub name: String,
    pub kind: &'static str,
    pub satisfied: bool,
    /// Signature the bridge defines under this name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub name: String,
    pub kind: &'static str,
}

/// What a module needs and offers, measured against a loader config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub imports: Vec<ImportReport>,
    pub exports: Vec<ExportReport>,
    pub entry_export: String,
    /// The entry export exists and is `() -> ()`.
    pub entry_ok: bool,
    pub memory_export: String,
    pub memory_ok: bool,
}

impl ModuleReport {
    pub fn unresolved(&self) -> impl Iterator<Item = &ImportReport> {
        self.imports.iter().filter(|i| !i.satisfied)
    }

    /// Every import resolves and the entry export can be called.
    pub fn is_loadable(&self) -> bool {
        self.unresolved().next().is_none() && self.entry_ok
    }
}

pub fn kind_name(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Func(_) => "func",
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        ExternType::Memory(_) => "memory",
        #[allow(unreachable_patterns)]
        _ => "other",
    }
}

/// Check every import of `module` against the bridge before linking.
///
/// An import the bridge does not define at all is unresolved; one it
/// defines with a different type is a mismatch.
pub fn check_imports(module: &Module) -> LoadResult<()> {
    for import in module.imports() {
        let ty = import.ty();
        if bridge::satisfies(import.module(), import.name(), &ty) {
            continue;
        }
        return Err(match (bridge::lookup(import.module(), import.name()), &ty) {
            (Some(expected), ExternType::Func(found)) => LoadError::ImportMismatch {
                module: import.module().to_string(),
                name: import.name().to_string(),
                expected: expected.signature(),
                found: bridge::describe(found),
            },
            (Some(expected), other) => LoadError::ImportMismatch {
                module: import.module().to_string(),
                name: import.name().to_string(),
                expected: expected.signature(),
                found: kind_name(other).to_string(),
            },
            (None, _) => LoadError::UnresolvedImport {
                module: import.module().to_string(),
                name: import.name().to_string(),
            },
        });
    }
    Ok(())
}

pub fn inspect_module(module: &Module, config: &LoaderConfig) -> ModuleReport {
    let imports = module
        .imports()
        .map(|import| {
            let ty = import.ty();
            ImportReport {
                module: import.module().to_string(),
                name: import.name().to_string(),
                kind: kind_name(&ty),
                satisfied: bridge::satisfies(import.module(), import.name(), &ty),
                expected: bridge::lookup(import.module(), import.name())
                    .map(|expected| expected.signature()),
            }
        })
        .collect();

    let exports = module
        .exports()
        .map(|export| ExportReport {
            name: export.name().to_string(),
            kind: kind_name(&export.ty()),
        })
        .collect();

    let entry_ok = matches!(
        module.get_export(&config.entry_export),
        Some(ExternType::Func(f)) if f.params().len() == 0 && f.results().len() == 0
    );
    let memory_ok = matches!(
        module.get_export(&config.memory_export),
        Some(ExternType::Memory(_))
    );

    ModuleReport {
        imports,
        exports,
        entry_export: config.entry_export.clone(),
        entry_ok,
        memory_export: config.memory_export.clone(),
        memory_ok,
    }
}
