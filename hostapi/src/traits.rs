//! Host API trait: host-side behavior of every guest import.
//!
//! Each method corresponds to a function the guest imports from the
//! `console` or `math` namespace (see `IMPORTS`). Implementors supply the
//! output channel (`emit`) and the random source (`random`); the numeric
//! bridging, memory views and diagnostics are provided here so that every
//! implementation formats identically.
//!
//! Memory is passed in as the current byte slice of the instance's `mem`
//! export (`None` if the module has no such export). The trait never holds
//! on to it, so a view cannot survive a memory growth.

use tracing::warn;

use crate::error::HostError;
use crate::numeric::{as_unsigned_32, as_unsigned_64, format_f32, format_f64};
use crate::types::MEMORY_EXPORT_GUIDANCE;
use crate::view::{read_utf8, write_utf8, Element, MemoryView, Utf8Write};

/// Host-side implementation of the `console` and `math` imports.
pub trait HostApi {
    /// Write one line to the output channel.
    fn emit(&self, line: &str);

    /// `math.random`: uniform in `[0, 1)`.
    fn random(&mut self) -> f64;

    /// `console.log_i32_s`: signed decimal.
    fn log_i32_s(&self, value: i32) {
        self.emit(&value.to_string());
    }

    /// `console.log_i32_u`: the same 32 bits read as unsigned.
    fn log_i32_u(&self, value: i32) {
        self.emit(&as_unsigned_32(value).to_string());
    }

    /// `console.log_i64_s`: signed decimal.
    fn log_i64_s(&self, value: i64) {
        self.emit(&value.to_string());
    }

    /// `console.log_i64_u`: the same 64 bits read as unsigned.
    fn log_i64_u(&self, value: i64) {
        self.emit(&as_unsigned_64(value).to_string());
    }

    /// `console.log_f32`: single precision, widened without rounding.
    fn log_f32(&self, value: f32) {
        self.emit(&format_f32(value));
    }

    /// `console.log_f64`
    fn log_f64(&self, value: f64) {
        self.emit(&format_f64(value));
    }

    /// Emit author guidance for a module without a `mem` export.
    fn memory_export_missing(&self) -> HostError {
        warn!("memory accessed on a module without a \"mem\" export");
        self.emit(MEMORY_EXPORT_GUIDANCE);
        HostError::MemoryExportMissing
    }

    /// Check for the `mem` export, emitting author guidance when it is absent.
    fn require_memory<'m>(&self, memory: Option<&'m [u8]>) -> Result<&'m [u8], HostError> {
        memory.ok_or_else(|| self.memory_export_missing())
    }

    /// `console.log_mem_as_utf8`: `length` bytes decoded as UTF-8.
    fn log_mem_as_utf8(
        &self,
        memory: Option<&[u8]>,
        byte_offset: u32,
        length: u32,
    ) -> Result<(), HostError> {
        let data = self.require_memory(memory)?;
        let text = read_utf8(data, byte_offset, length)?;
        self.emit(&text);
        Ok(())
    }

    /// `console.log_mem_as_{T}`: `length` elements of `T` as `[a, b, ...]`.
    fn log_mem_as<T: Element>(
        &self,
        memory: Option<&[u8]>,
        byte_offset: u32,
        length: u32,
    ) -> Result<(), HostError> {
        let data = self.require_memory(memory)?;
        let view = MemoryView::<T>::new(data, byte_offset, length)?;
        self.emit(&view.to_string());
        Ok(())
    }

    /// Seed guest memory with text. Not a guest import.
    ///
    /// Writes at most `buffer_len` bytes; when the text does not fit, the
    /// written prefix ends on a character boundary and a warning line reports
    /// how much was written.
    fn set_mem_as_utf8(
        &self,
        memory: Option<&mut [u8]>,
        byte_offset: u32,
        buffer_len: u32,
        text: &str,
    ) -> Result<Utf8Write, HostError> {
        let data = memory.ok_or_else(|| self.memory_export_missing())?;
        let written = write_utf8(data, byte_offset, buffer_len, text)?;
        if written.is_truncated() {
            warn!(
                buffer_len,
                chars_written = written.chars_written,
                chars_total = written.chars_total,
                "text truncated while seeding guest memory"
            );
            self.emit(&format!(
                "Warning: Buffer of size {} was not large enough to write string of size {}. Truncated after {} characters",
                buffer_len, written.chars_total, written.chars_written
            ));
        }
        Ok(written)
    }
}

#[cfg(test)]
#[allow(clippy::approx_constant)]
mod tests {
    use super::*;
    use crate::mem_sink::MemSink;
    use crate::sink::LogSink;
    use crate::view::write_elements;

    struct TestHost {
        sink: MemSink,
        next: f64,
    }

    impl TestHost {
        fn new() -> Self {
            Self {
                sink: MemSink::new(),
                next: 0.25,
            }
        }
    }

    impl HostApi for TestHost {
        fn emit(&self, line: &str) {
            self.sink.write_line(line);
        }

        fn random(&mut self) -> f64 {
            self.next
        }
    }

    #[test]
    fn test_log_i32_signed_and_unsigned() {
        let host = TestHost::new();
        host.log_i32_s(-1);
        host.log_i32_u(-1);
        host.log_i32_u(7);
        assert_eq!(host.sink.lines(), vec!["-1", "4294967295", "7"]);
    }

    #[test]
    fn test_log_i64_signed_and_unsigned() {
        let host = TestHost::new();
        host.log_i64_s(99);
        host.log_i64_s(-99);
        host.log_i64_u(-1);
        assert_eq!(host.sink.lines(), vec!["99", "-99", "18446744073709551615"]);
    }

    #[test]
    fn test_log_floats() {
        let host = TestHost::new();
        host.log_f32(3.14);
        host.log_f64(3.14);
        assert_eq!(host.sink.lines(), vec!["3.140000104904175", "3.14"]);
    }

    #[test]
    fn test_log_mem_as_typed() {
        let host = TestHost::new();
        let mut mem = vec![0u8; 64];
        write_elements(&mut mem, 8, &[-3i32, 5]).unwrap();
        host.log_mem_as::<i32>(Some(&mem), 8, 2).unwrap();
        host.log_mem_as::<u32>(Some(&mem), 8, 1).unwrap();
        assert_eq!(host.sink.lines(), vec!["[-3, 5]", "[4294967293]"]);
    }

    #[test]
    fn test_log_mem_as_utf8() {
        let host = TestHost::new();
        let mut mem = vec![0u8; 64];
        mem[10..24].copy_from_slice(b"Goodbye, Mars!");
        host.log_mem_as_utf8(Some(&mem), 10, 14).unwrap();
        assert_eq!(host.sink.lines(), vec!["Goodbye, Mars!"]);
    }

    #[test]
    fn test_missing_memory_emits_guidance_then_fails() {
        let host = TestHost::new();
        let err = host.log_mem_as::<u8>(None, 0, 1).unwrap_err();
        assert_eq!(err, HostError::MemoryExportMissing);
        let lines = host.sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("(memory (export \"mem\") 1)"));
    }

    #[test]
    fn test_out_of_bounds_emits_nothing() {
        let host = TestHost::new();
        let mem = vec![0u8; 4];
        let err = host.log_mem_as::<u64>(Some(&mem), 0, 1).unwrap_err();
        assert!(matches!(err, HostError::OutOfBounds { .. }));
        assert!(host.sink.is_empty());
    }

    #[test]
    fn test_set_mem_as_utf8_round_trip() {
        let host = TestHost::new();
        let mut mem = vec![0u8; 64];
        let written = host.set_mem_as_utf8(Some(&mut mem), 4, 32, "Hello, Venus!").unwrap();
        assert!(!written.is_truncated());
        host.log_mem_as_utf8(Some(&mem), 4, written.bytes_written as u32).unwrap();
        assert_eq!(host.sink.lines(), vec!["Hello, Venus!"]);
    }

    #[test]
    fn test_set_mem_as_utf8_truncation_warning() {
        let host = TestHost::new();
        let mut mem = vec![0u8; 64];
        let written = host.set_mem_as_utf8(Some(&mut mem), 0, 5, "Goodbye, Mars!").unwrap();
        assert_eq!(written.chars_written, 5);
        assert_eq!(
            host.sink.take(),
            vec!["Warning: Buffer of size 5 was not large enough to write string of size 14. Truncated after 5 characters"]
        );
        host.log_mem_as_utf8(Some(&mem), 0, 5).unwrap();
        assert_eq!(host.sink.lines(), vec!["Goodb"]);
    }

    #[test]
    fn test_set_mem_without_memory() {
        let host = TestHost::new();
        let err = host.set_mem_as_utf8(None, 0, 4, "hi").unwrap_err();
        assert_eq!(err, HostError::MemoryExportMissing);
        assert_eq!(host.sink.len(), 1);
    }

    #[test]
    fn test_random_is_delegated() {
        let mut host = TestHost::new();
        assert_eq!(host.random(), 0.25);
    }
}
