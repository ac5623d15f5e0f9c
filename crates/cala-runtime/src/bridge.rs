//! Host functions imported by the module.
//!
//! Everything lives in the `env` namespace. Two string ABIs are provided:
//!
//! | Import | Signature | Notes |
//! |--------|-----------|-------|
//! | `navigator_userAgent_Len` | `() -> i32` | stash user agent in the pending slot, return code units |
//! | `navigator_userAgent_Ptr` | `(ptr)` | write the pending slot at `ptr` |
//! | `console_warn` / `console_info` / `console_debug` | `(ptr, len)` | decode `len` units at `ptr` |
//! | `alert` | `(ptr, len)` | same, on the blocking alert channel |
//! | `navigator_userAgent_open` | `() -> i32` | register user agent, return a handle |
//! | `host_string_len` | `(handle) -> i32` | code units, or `-1` |
//! | `host_string_take` | `(handle, ptr, capacity) -> i32` | write a frame, release the handle |
//! | `host_string_release` | `(handle) -> i32` | drop a handle unread: `0`, or `-1` |
//! | `host_log` | `(level, ptr)` | log the frame at `ptr` on channel `level` |
//!
//! A handle lives until it is taken or released, or until the session ends.
//!
//! Every read and write is bounds-checked. A bad pointer or length traps
//! the module instead of touching memory outside the requested range.

use anyhow::anyhow;
use cala_core::console::HostConsole;
use cala_core::error::{CalaError, MarshalError};
use cala_core::strings::{PendingString, StringTable};
use cala_core::types::{Channel, HostIdentity, StringHandle};
use cala_core::{utf16, wire};
use std::sync::Arc;
use wasmtime::{Caller, ExternType, FuncType, Linker, Memory, ValType};

/// Import namespace.
pub const ENV: &str = "env";

pub const USER_AGENT_LEN: &str = "navigator_userAgent_Len";
pub const USER_AGENT_PTR: &str = "navigator_userAgent_Ptr";
pub const CONSOLE_WARN: &str = "console_warn";
pub const CONSOLE_INFO: &str = "console_info";
pub const CONSOLE_DEBUG: &str = "console_debug";
pub const ALERT: &str = "alert";
pub const USER_AGENT_OPEN: &str = "navigator_userAgent_open";
pub const STRING_LEN: &str = "host_string_len";
pub const STRING_TAKE: &str = "host_string_take";
pub const STRING_RELEASE: &str = "host_string_release";
pub const HOST_LOG: &str = "host_log";

/// A function the bridge defines. Every parameter and result is `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeImport {
    pub name: &'static str,
    pub params: usize,
    pub results: usize,
}

impl BridgeImport {
    const fn new(name: &'static str, params: usize, results: usize) -> Self {
        Self {
            name,
            params,
            results,
        }
    }

    /// Would a module importing this function as `ty` link against it?
    pub fn accepts(&self, ty: &FuncType) -> bool {
        ty.params().len() == self.params
            && ty.results().len() == self.results
            && ty.params().chain(ty.results()).all(|t| matches!(t, ValType::I32))
    }

    /// The signature in text format, e.g. `(func (param i32) (result i32))`.
    pub fn signature(&self) -> String {
        signature_text(&vec!["i32"; self.params], &vec!["i32"; self.results])
    }
}

/// Every function the bridge defines under [`ENV`].
pub const IMPORTS: &[BridgeImport] = &[
    BridgeImport::new(USER_AGENT_LEN, 0, 1),
    BridgeImport::new(USER_AGENT_PTR, 1, 0),
    BridgeImport::new(CONSOLE_WARN, 2, 0),
    BridgeImport::new(CONSOLE_INFO, 2, 0),
    BridgeImport::new(CONSOLE_DEBUG, 2, 0),
    BridgeImport::new(ALERT, 2, 0),
    BridgeImport::new(USER_AGENT_OPEN, 0, 1),
    BridgeImport::new(STRING_LEN, 1, 1),
    BridgeImport::new(STRING_TAKE, 3, 1),
    BridgeImport::new(STRING_RELEASE, 1, 1),
    BridgeImport::new(HOST_LOG, 2, 0),
];

/// Status codes returned by the handle-based imports.
pub const STATUS_UNKNOWN_HANDLE: i32 = -1;
pub const STATUS_INSUFFICIENT_CAPACITY: i32 = -2;
pub const STATUS_OUT_OF_BOUNDS: i32 = -3;

/// The bridge function named `module::name`, if there is one.
pub fn lookup(module: &str, name: &str) -> Option<&'static BridgeImport> {
    if module != ENV {
        return None;
    }
    IMPORTS.iter().find(|import| import.name == name)
}

/// Does the bridge define `module::name`, whatever its type?
pub fn provides(module: &str, name: &str) -> bool {
    lookup(module, name).is_some()
}

/// Does the bridge satisfy an import of `module::name` with type `ty`?
pub fn satisfies(module: &str, name: &str, ty: &ExternType) -> bool {
    match (lookup(module, name), ty) {
        (Some(import), ExternType::Func(func)) => import.accepts(func),
        _ => false,
    }
}

/// Render a function type the way the text format writes it.
pub fn describe(ty: &FuncType) -> String {
    let params: Vec<&str> = ty.params().map(|t| val_type_name(&t)).collect();
    let results: Vec<&str> = ty.results().map(|t| val_type_name(&t)).collect();
    signature_text(&params, &results)
}

fn val_type_name(ty: &ValType) -> &'static str {
    match ty {
        ValType::I32 => "i32",
        ValType::I64 => "i64",
        ValType::F32 => "f32",
        ValType::F64 => "f64",
        ValType::V128 => "v128",
        ValType::Ref(_) => "ref",
        #[allow(unreachable_patterns)]
        _ => "other",
    }
}

fn signature_text(params: &[&str], results: &[&str]) -> String {
    let mut text = String::from("(func");
    if !params.is_empty() {
        text.push_str(&format!(" (param {})", params.join(" ")));
    }
    if !results.is_empty() {
        text.push_str(&format!(" (result {})", results.join(" ")));
    }
    text.push(')');
    text
}

/// Per-instance host state, stored in the `wasmtime::Store`.
pub struct HostState {
    identity: HostIdentity,
    console: Arc<dyn HostConsole>,
    pending: PendingString,
    strings: StringTable,
    memory: Option<Memory>,
}

impl HostState {
    pub fn new(identity: HostIdentity, console: Arc<dyn HostConsole>) -> Self {
        Self {
            identity,
            console,
            pending: PendingString::default(),
            strings: StringTable::new(),
            memory: None,
        }
    }

    /// Bind the module's memory export. Done once, after instantiation.
    ///
    /// The handle stays valid when the module grows its memory; the byte
    /// slice is looked up again on every access.
    pub fn bind_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }

    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    pub fn console(&self) -> &Arc<dyn HostConsole> {
        &self.console
    }

    /// The legacy pending-string slot.
    pub fn pending(&self) -> &PendingString {
        &self.pending
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }
}

/// Split the caller into the bound memory's bytes and the host state.
fn memory_and_state<'a>(
    caller: &'a mut Caller<'_, HostState>,
) -> anyhow::Result<(&'a mut [u8], &'a mut HostState)> {
    let memory = caller
        .data()
        .memory
        .ok_or_else(|| anyhow!("linear memory is not bound"))?;
    Ok(memory.data_and_store_mut(caller))
}

fn status_code(err: &CalaError) -> i32 {
    match err {
        CalaError::Marshal(MarshalError::InsufficientCapacity { .. }) => {
            STATUS_INSUFFICIENT_CAPACITY
        }
        CalaError::Marshal(_) => STATUS_OUT_OF_BOUNDS,
        _ => STATUS_UNKNOWN_HANDLE,
    }
}

/// Define every bridge import on `linker`.
pub fn register(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap(ENV, USER_AGENT_LEN, |mut caller: Caller<'_, HostState>| -> i32 {
        let state = caller.data_mut();
        state.pending.stash(state.identity.user_agent()) as i32
    })?;

    linker.func_wrap(
        ENV,
        USER_AGENT_PTR,
        |mut caller: Caller<'_, HostState>, ptr: i32| -> anyhow::Result<()> {
            let (bytes, state) = memory_and_state(&mut caller)?;
            state.pending.write_into(bytes, ptr as u32)?;
            Ok(())
        },
    )?;

    for (name, channel) in [
        (CONSOLE_WARN, Channel::Warn),
        (CONSOLE_INFO, Channel::Info),
        (CONSOLE_DEBUG, Channel::Debug),
        (ALERT, Channel::Alert),
    ] {
        linker.func_wrap(
            ENV,
            name,
            move |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| -> anyhow::Result<()> {
                let (bytes, state) = memory_and_state(&mut caller)?;
                let text = utf16::read_string(&*bytes, ptr as u32, len as u32)?;
                let console = Arc::clone(&state.console);
                console.emit(channel, &text);
                Ok(())
            },
        )?;
    }

    linker.func_wrap(
        ENV,
        USER_AGENT_OPEN,
        |mut caller: Caller<'_, HostState>| -> anyhow::Result<i32> {
            let state = caller.data_mut();
            let handle = state.strings.open(state.identity.user_agent())?;
            Ok(handle.as_i32())
        },
    )?;

    linker.func_wrap(
        ENV,
        STRING_LEN,
        |caller: Caller<'_, HostState>, handle: i32| -> i32 {
            StringHandle::from_i32(handle)
                .and_then(|h| caller.data().strings.len(h).ok())
                .map(|len| len as i32)
                .unwrap_or(STATUS_UNKNOWN_HANDLE)
        },
    )?;

    linker.func_wrap(
        ENV,
        STRING_TAKE,
        |mut caller: Caller<'_, HostState>,
         handle: i32,
         ptr: i32,
         capacity: i32|
         -> anyhow::Result<i32> {
            let Some(handle) = StringHandle::from_i32(handle) else {
                return Ok(STATUS_UNKNOWN_HANDLE);
            };
            let (bytes, state) = memory_and_state(&mut caller)?;
            let capacity = capacity.max(0) as u32;
            match state.strings.take_into(bytes, handle, ptr as u32, capacity) {
                Ok(written) => Ok(written as i32),
                Err(err) => Ok(status_code(&err)),
            }
        },
    )?;

    linker.func_wrap(
        ENV,
        STRING_RELEASE,
        |mut caller: Caller<'_, HostState>, handle: i32| -> i32 {
            let released = StringHandle::from_i32(handle)
                .map(|h| caller.data_mut().strings.release(h))
                .unwrap_or(false);
            if released {
                0
            } else {
                STATUS_UNKNOWN_HANDLE
            }
        },
    )?;

    linker.func_wrap(
        ENV,
        HOST_LOG,
        |mut caller: Caller<'_, HostState>, level: i32, ptr: i32| -> anyhow::Result<()> {
            let channel = Channel::from_code(level)?;
            let (bytes, state) = memory_and_state(&mut caller)?;
            let text = wire::read_frame_string(&*bytes, ptr as u32)?;
            let console = Arc::clone(&state.console);
            console.emit(channel, &text);
            Ok(())
        },
    )?;

    Ok(())
}
