//! Line framing for the inbound byte stream
//!
//! Bytes arrive in arbitrary chunks. [`LineFramer`] accumulates them and
//! yields each complete `\n`-terminated line, with one trailing `\r`
//! stripped, in arrival order. Empty lines are dropped.

/// Splits a byte stream into text lines
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Append `bytes` and return every line completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let mut line = &self.buffer[start..end];
            if let Some((&b'\r', rest)) = line.split_last() {
                line = rest;
            }
            if !line.is_empty() {
                lines.push(String::from_utf8_lossy(line).into_owned());
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        lines
    }

    /// Bytes of the incomplete trailing line
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}
