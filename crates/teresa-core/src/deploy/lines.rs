//! Reassembles newline-delimited lines from arbitrary response chunks.

/// Longest line kept in memory before it is emitted in pieces.
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Buffers bytes until a full line is available.
///
/// Lines end at `\n`; a preceding `\r` is dropped. Splitting happens on the
/// raw bytes so a multi-byte UTF-8 sequence is never cut in half. A line
/// longer than the limit is emitted in limit-sized pieces.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    max_line: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(DEFAULT_MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_line: max_line.max(4),
        }
    }

    /// Append a chunk and return every line it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            let newline = self.pending.iter().position(|b| *b == b'\n');
            match newline {
                Some(pos) if pos <= self.max_line => {
                    let mut line = self.take(pos + 1);
                    line.pop();
                    lines.push(decode(line));
                }
                _ if self.pending.len() > self.max_line => {
                    let cut = char_boundary(&self.pending, self.max_line);
                    lines.push(decode(self.take(cut)));
                }
                _ => break,
            }
        }
        lines
    }

    fn take(&mut self, len: usize) -> Vec<u8> {
        let rest = self.pending.split_off(len);
        std::mem::replace(&mut self.pending, rest)
    }

    /// Take whatever is left after the stream ends.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(decode(std::mem::take(&mut self.pending)))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Largest cut at or below `max` that does not split a UTF-8 sequence.
fn char_boundary(bytes: &[u8], max: usize) -> usize {
    let mut cut = max;
    while cut > 0 && (bytes[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    if cut == 0 { max } else { cut }
}

fn decode(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_complete_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"one\ntwo\n"), vec!["one", "two"]);
        assert!(buf.is_empty());
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn joins_lines_across_chunks() {
        let mut buf = LineBuffer::new();
        assert!(buf.push(b"buil").is_empty());
        assert!(buf.push(b"ding").is_empty());
        assert_eq!(buf.push(b"...\nsta"), vec!["building..."]);
        assert_eq!(buf.push(b"rting...\n"), vec!["starting..."]);
    }

    #[test]
    fn strips_carriage_returns() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"windows\r\n"), vec!["windows"]);
    }

    #[test]
    fn keeps_empty_lines() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn flushes_trailing_line_without_newline() {
        let mut buf = LineBuffer::new();
        assert_eq!(buf.push(b"done\nno newline"), vec!["done"]);
        assert_eq!(buf.finish().as_deref(), Some("no newline"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn multibyte_sequence_split_across_chunks() {
        let mut buf = LineBuffer::new();
        let text = "implantação\n".as_bytes();
        let (head, tail) = text.split_at(9);
        assert!(buf.push(head).is_empty());
        assert_eq!(buf.push(tail), vec!["implantação"]);
    }

    #[test]
    fn overlong_line_is_emitted_in_pieces() {
        let mut buf = LineBuffer::with_max_line(8);
        assert!(buf.push(b"abcd").is_empty());
        assert_eq!(buf.push(b"efghijkl"), vec!["abcdefgh"]);
        assert_eq!(buf.push(b"\nnext\n"), vec!["ijkl", "next"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn unterminated_stream_stays_bounded() {
        let mut buf = LineBuffer::with_max_line(1024);
        let mut emitted = 0;
        for _ in 0..100 {
            emitted += buf.push(&[b'x'; 512]).len();
            assert!(buf.pending.len() <= 1024);
        }
        assert_eq!(emitted, 49);
    }

    #[test]
    fn overlong_cut_respects_utf8() {
        let mut buf = LineBuffer::with_max_line(5);
        // "aaaa" + 'ç' (2 bytes) crosses the limit at byte 5.
        let lines = buf.push("aaaaçb\n".as_bytes());
        assert_eq!(lines, vec!["aaaa", "çb"]);
    }
}
