//! Incremental validation for the streaming strategy.
//!
//! Chunks are pushed as they arrive from the source. Each complete section
//! is parsed and validated right away, function bodies included, so a
//! response that is not a wasm module (an HTML error page, a truncated
//! upload) is rejected on its first chunk instead of after the download.

use crate::error::{LoadError, LoadResult};
use tracing::debug;
use wasmparser::{
    Chunk, Encoding, FuncValidatorAllocations, Parser, Payload, ValidPayload, Validator,
};

/// Validates a module body pushed in arbitrary chunk sizes.
pub struct StreamingValidator {
    parser: Parser,
    validator: Validator,
    allocs: FuncValidatorAllocations,
    /// Bytes received but not yet consumed by the parser.
    pending: Vec<u8>,
    /// Every byte received, for compilation once validation finishes.
    body: Vec<u8>,
    chunks: usize,
    done: bool,
}

impl StreamingValidator {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(0),
            validator: Validator::new(),
            allocs: FuncValidatorAllocations::default(),
            pending: Vec::new(),
            body: Vec::new(),
            chunks: 0,
            done: false,
        }
    }

    /// Feed the next chunk and validate everything it completes.
    pub fn push(&mut self, chunk: &[u8]) -> LoadResult<()> {
        self.chunks += 1;
        self.body.extend_from_slice(chunk);
        self.pending.extend_from_slice(chunk);
        self.drive(false)
    }

    /// Signal end of input. Returns the full module body once it has been
    /// validated end to end.
    pub fn finish(mut self) -> LoadResult<Vec<u8>> {
        self.drive(true)?;
        if !self.done {
            return Err(LoadError::Validate("unexpected end of module".to_string()));
        }
        debug!(
            bytes = self.body.len(),
            chunks = self.chunks,
            "streamed module validated"
        );
        Ok(self.body)
    }

    /// Bytes received so far.
    pub fn received(&self) -> usize {
        self.body.len()
    }

    fn drive(&mut self, eof: bool) -> LoadResult<()> {
        loop {
            if self.done {
                if !self.pending.is_empty() {
                    return Err(LoadError::Validate(format!(
                        "{} trailing bytes after end of module",
                        self.pending.len()
                    )));
                }
                return Ok(());
            }

            let consumed = match self.parser.parse(&self.pending, eof).map_err(invalid)? {
                Chunk::NeedMoreData(_) => return Ok(()),
                Chunk::Parsed { consumed, payload } => {
                    self.done = check_payload(&mut self.validator, &mut self.allocs, &payload)?;
                    consumed
                }
            };
            self.pending.drain(..consumed);
        }
    }
}

impl Default for StreamingValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate one payload. Returns `true` once the module is complete.
fn check_payload(
    validator: &mut Validator,
    allocs: &mut FuncValidatorAllocations,
    payload: &Payload<'_>,
) -> LoadResult<bool> {
    if let Payload::Version {
        encoding: Encoding::Component,
        ..
    } = payload
    {
        return Err(LoadError::Validate(
            "components are not supported, expected a core module".to_string(),
        ));
    }

    match validator.payload(payload).map_err(invalid)? {
        ValidPayload::Ok | ValidPayload::Parser(_) => Ok(false),
        ValidPayload::Func(func, body) => {
            let mut func = func.into_validator(std::mem::take(allocs));
            func.validate(&body).map_err(invalid)?;
            *allocs = func.into_allocations();
            Ok(false)
        }
        ValidPayload::End(_) => Ok(true),
    }
}

fn invalid(err: wasmparser::BinaryReaderError) -> LoadError {
    LoadError::Validate(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
        (module
          (memory (export "memory") 1)
          (func $add (param i32 i32) (result i32)
            local.get 0
            local.get 1
            i32.add)
          (func (export "exported_func")
            i32.const 1
            i32.const 2
            call $add
            drop))
    "#;

    #[test]
    fn byte_at_a_time_validates() {
        let bytes = wat::parse_str(MODULE).unwrap();
        let mut validator = StreamingValidator::new();
        for b in &bytes {
            validator.push(std::slice::from_ref(b)).unwrap();
        }
        assert_eq!(validator.finish().unwrap(), bytes);
    }

    #[test]
    fn single_chunk_validates() {
        let bytes = wat::parse_str(MODULE).unwrap();
        let mut validator = StreamingValidator::new();
        validator.push(&bytes).unwrap();
        assert_eq!(validator.received(), bytes.len());
        assert_eq!(validator.finish().unwrap(), bytes);
    }

    #[test]
    fn html_body_fails_on_first_chunk() {
        let mut validator = StreamingValidator::new();
        let err = validator.push(b"<!DOCTYPE html><html>404</html>").unwrap_err();
        assert!(matches!(err, LoadError::Validate(_)));
    }

    #[test]
    fn truncated_module_fails_at_finish() {
        let bytes = wat::parse_str(MODULE).unwrap();
        let mut validator = StreamingValidator::new();
        validator.push(&bytes[..bytes.len() - 3]).unwrap();
        assert!(validator.finish().is_err());
    }

    #[test]
    fn empty_body_fails() {
        assert!(StreamingValidator::new().finish().is_err());
    }

    #[test]
    fn ill_typed_function_is_rejected() {
        // `wat` assembles without type checking.
        let bytes = wat::parse_str(r#"(module (func (result i32) i64.const 1))"#).unwrap();
        let mut validator = StreamingValidator::new();
        let err = match validator.push(&bytes) {
            Err(e) => e,
            Ok(()) => validator.finish().unwrap_err(),
        };
        assert!(matches!(err, LoadError::Validate(_)));
    }
}
