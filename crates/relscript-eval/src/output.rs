//! Line-oriented output sinks.
//!
//! The engine never prints directly; queries, PRINT, and ALL counts go
//! through an [`OutputSink`] so the REPL, a file capture, or a test can
//! own the lines.

use std::cell::RefCell;
use std::rc::Rc;

/// Abstract line-oriented text sink.
pub trait OutputSink {
    fn write_line(&mut self, line: &str);
}

/// Captures lines in memory behind a shared handle, so a test can keep a
/// clone and read back what the interpreter wrote.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

/// Writes lines to stdout (the REPL's default sink).
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn write_line(&mut self, line: &str) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_shared_handle() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_line("one");
        writer.write_line("two");
        assert_eq!(sink.lines(), vec!["one".to_string(), "two".to_string()]);
        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
