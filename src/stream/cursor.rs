//! Progressive-text cursor and line assembly
//!
//! The cursor is the byte offset to request next. It only moves to offsets
//! the server reported, and it moves for every chunk regardless of which
//! lines end up printed. Bytes of a line split across chunks are held back
//! until its newline arrives, and only whole lines are decoded as UTF-8.

use jenkdo_protocol::{LogFetch, PIPELINE_MARKER};

/// Whether a console line is shown
pub fn is_visible(line: &str, verbose: bool) -> bool {
    verbose || !line.contains(PIPELINE_MARKER)
}

/// Result of accepting one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUpdate {
    /// Complete lines to print, in order
    pub lines: Vec<String>,
    /// Complete lines dropped by the marker filter
    pub suppressed: usize,
    /// Whether the fetch carried new bytes
    pub had_activity: bool,
}

/// Read position within one build's console log
#[derive(Debug)]
pub struct LogCursor {
    start_at: u64,
    verbose: bool,
    pending: Vec<u8>,
    total_bytes: u64,
    total_lines: u64,
    suppressed_lines: u64,
}

impl LogCursor {
    pub fn new(verbose: bool) -> Self {
        Self {
            start_at: 0,
            verbose,
            pending: Vec::new(),
            total_bytes: 0,
            total_lines: 0,
            suppressed_lines: 0,
        }
    }

    /// Offset to send as `start` on the next fetch
    pub fn start_at(&self) -> u64 {
        self.start_at
    }

    /// Bytes of console text received so far
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    pub fn suppressed_lines(&self) -> u64 {
        self.suppressed_lines
    }

    /// Fold one decoded fetch into the cursor.
    ///
    /// Only `Chunk` moves the cursor; every other outcome retries at the
    /// same offset.
    pub fn accept(&mut self, fetch: &LogFetch) -> StreamUpdate {
        let (bytes, next_start) = match fetch {
            LogFetch::Chunk {
                bytes, next_start, ..
            } => (bytes, *next_start),
            LogFetch::NotStarted | LogFetch::ServerError { .. } | LogFetch::Empty => {
                return StreamUpdate::default();
            }
        };

        self.start_at = next_start;
        self.total_bytes += bytes.len() as u64;
        self.pending.extend_from_slice(bytes);

        let mut update = StreamUpdate {
            had_activity: true,
            ..StreamUpdate::default()
        };

        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let rest = self.pending.split_off(end + 1);
            let mut line = std::mem::replace(&mut self.pending, rest);
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            self.emit(&line, &mut update);
        }
        update
    }

    /// Release a trailing line that never got its newline
    pub fn finish(&mut self) -> StreamUpdate {
        let mut update = StreamUpdate::default();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line, &mut update);
        }
        update
    }

    fn emit(&mut self, line: &[u8], update: &mut StreamUpdate) {
        let line = String::from_utf8_lossy(line).into_owned();
        self.total_lines += 1;
        if is_visible(&line, self.verbose) {
            update.lines.push(line);
        } else {
            self.suppressed_lines += 1;
            update.suppressed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, next_start: u64) -> LogFetch {
        LogFetch::Chunk {
            bytes: text.as_bytes().to_vec(),
            next_start,
            more: true,
        }
    }

    #[test]
    fn test_marker_filter() {
        assert!(is_visible("hello", false));
        assert!(!is_visible("[Pipeline] End", false));
        assert!(!is_visible("  [Pipeline] { (Build)", false));
        assert!(is_visible("[Pipeline] End", true));
    }

    #[test]
    fn test_cursor_follows_server_offsets() {
        let mut cursor = LogCursor::new(false);

        let update = cursor.accept(&chunk("hello\n", 6));
        assert_eq!(update.lines, vec!["hello"]);
        assert_eq!(cursor.start_at(), 6);

        assert_eq!(cursor.accept(&LogFetch::NotStarted), StreamUpdate::default());
        assert_eq!(cursor.start_at(), 6);

        let update = cursor.accept(&chunk("[Pipeline] End\n", 21));
        assert!(update.lines.is_empty());
        assert_eq!(update.suppressed, 1);
        assert!(update.had_activity);
        assert_eq!(cursor.start_at(), 21);
        assert_eq!(cursor.total_bytes(), 21);
    }

    #[test]
    fn test_non_chunks_keep_cursor() {
        let mut cursor = LogCursor::new(true);
        cursor.accept(&chunk("a\n", 2));

        for fetch in [
            LogFetch::NotStarted,
            LogFetch::Empty,
            LogFetch::ServerError { status: 502 },
        ] {
            let update = cursor.accept(&fetch);
            assert!(!update.had_activity);
            assert_eq!(cursor.start_at(), 2);
        }
    }

    #[test]
    fn test_partial_lines_are_joined() {
        let mut cursor = LogCursor::new(false);

        let update = cursor.accept(&chunk("[Pipe", 5));
        assert!(update.lines.is_empty());
        assert_eq!(update.suppressed, 0);

        let update = cursor.accept(&chunk("line] sh\r\nbuil", 19));
        assert!(update.lines.is_empty());
        assert_eq!(update.suppressed, 1);

        let update = cursor.accept(&chunk("ding\n", 24));
        assert_eq!(update.lines, vec!["building"]);
        assert_eq!(cursor.start_at(), 24);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let mut cursor = LogCursor::new(false);

        let update = cursor.accept(&LogFetch::Chunk {
            bytes: b"caf\xC3".to_vec(),
            next_start: 4,
            more: true,
        });
        assert!(update.lines.is_empty());

        let update = cursor.accept(&LogFetch::Chunk {
            bytes: b"\xA9\n\xE2\x9C".to_vec(),
            next_start: 8,
            more: true,
        });
        assert_eq!(update.lines, vec!["café"]);

        cursor.accept(&LogFetch::Chunk {
            bytes: b"\x93".to_vec(),
            next_start: 9,
            more: false,
        });
        assert_eq!(cursor.finish().lines, vec!["✓"]);
        assert_eq!(cursor.total_bytes(), 9);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut cursor = LogCursor::new(false);
        cursor.accept(&chunk("done\nFinished: SUCCESS", 22));

        let update = cursor.finish();
        assert_eq!(update.lines, vec!["Finished: SUCCESS"]);
        assert_eq!(cursor.finish(), StreamUpdate::default());
        assert_eq!(cursor.total_lines(), 2);
    }

    #[test]
    fn test_verbose_drops_nothing() {
        let mut cursor = LogCursor::new(true);
        let update = cursor.accept(&chunk("[Pipeline] stage\nok\n[Pipeline] }\n", 33));
        assert_eq!(update.lines, vec!["[Pipeline] stage", "ok", "[Pipeline] }"]);
        assert_eq!(cursor.suppressed_lines(), 0);
    }

    #[test]
    fn test_blank_lines_are_kept() {
        let mut cursor = LogCursor::new(false);
        let update = cursor.accept(&chunk("a\n\nb\n", 5));
        assert_eq!(update.lines, vec!["a", "", "b"]);
    }
}
