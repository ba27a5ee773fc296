/// Splits a byte stream into complete `\n`-terminated lines.
///
/// Transport chunks may end anywhere, including inside a multi-byte
/// character; the unterminated tail is kept until the next chunk.
#[derive(Debug, Default)]
pub struct LineDecoder {
    pending_tail: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending_tail.len()
    }

    /// Consume a chunk and return every line it completes. Blank lines are
    /// skipped and a trailing `\r` is dropped.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.pending_tail.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];
            if let Some(line) = Self::take_line(&mut self.pending_tail) {
                lines.push(line);
            }
        }
        self.pending_tail.extend_from_slice(rest);
        lines
    }

    /// Flush an unterminated final line once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        Self::take_line(&mut self.pending_tail)
    }

    fn take_line(buf: &mut Vec<u8>) -> Option<String> {
        let bytes = std::mem::take(buf);
        let line = String::from_utf8_lossy(&bytes);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_lines_across_chunks() {
        let mut d = LineDecoder::new();
        assert!(d.feed(b"{\"a\":").is_empty());
        assert_eq!(d.feed(b"1}\n{\"b\""), vec!["{\"a\":1}".to_string()]);
        assert_eq!(d.pending(), 4);
        assert_eq!(
            d.feed(b":2}\r\n\n{\"c\":3}\n"),
            vec!["{\"b\":2}".to_string(), "{\"c\":3}".to_string()]
        );
        assert_eq!(d.finish(), None);
    }

    #[test]
    fn split_inside_multibyte_character() {
        let text = "{\"out\":\"λ→x\"}\n".as_bytes();
        let mut d = LineDecoder::new();
        let mut lines = Vec::new();
        for byte in text {
            lines.extend(d.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(lines, vec!["{\"out\":\"λ→x\"}".to_string()]);
    }

    #[test]
    fn finish_flushes_unterminated_tail() {
        let mut d = LineDecoder::new();
        d.feed(b"first\nsecond");
        assert_eq!(d.finish(), Some("second".to_string()));
        assert_eq!(d.pending(), 0);
    }
}
