//! Human-facing output.
//!
//! Status lines are colored `> ...` lines; console text from the build is
//! printed verbatim. Diagnostics go through `tracing`, not through here.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

use owo_colors::OwoColorize;

/// Whether colors make sense for this process's stdout
fn colors_enabled() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
        return false;
    }
    io::stdout().is_terminal()
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Info,
    Progress,
    Error,
}

/// Output sink shared by all components
pub struct Terminal {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl Terminal {
    pub fn stdout() -> Self {
        Self {
            out: Mutex::new(Box::new(io::stdout())),
            color: colors_enabled(),
        }
    }

    /// Uncolored terminal writing into a buffer that tests can read back
    pub fn capture() -> (Self, Capture) {
        let capture = Capture::default();
        let terminal = Self {
            out: Mutex::new(Box::new(capture.clone())),
            color: false,
        };
        (terminal, capture)
    }

    fn write(&self, text: &str) {
        // A closed stdout must not take the teardown sequence down with it
        if let Ok(mut out) = self.out.lock() {
            let _ = out.write_all(text.as_bytes());
            let _ = out.flush();
        }
    }

    fn paint(&self, tone: Tone, msg: &str) -> String {
        if !self.color {
            return msg.to_string();
        }
        match tone {
            Tone::Info => msg.green().to_string(),
            Tone::Progress => msg.yellow().to_string(),
            Tone::Error => msg.red().to_string(),
        }
    }

    /// Green status line
    pub fn info(&self, msg: impl AsRef<str>) {
        let line = self.paint(Tone::Info, msg.as_ref());
        self.write(&format!("{}\n", line));
    }

    /// Red status line
    pub fn error(&self, msg: impl AsRef<str>) {
        let line = self.paint(Tone::Error, msg.as_ref());
        self.write(&format!("{}\n", line));
    }

    /// Green text left open for the user's answer (no newline)
    pub fn prompt(&self, msg: impl AsRef<str>) {
        let line = self.paint(Tone::Info, msg.as_ref());
        self.write(&line);
    }

    /// Overwrite the current line in place (no newline)
    pub fn progress(&self, msg: impl AsRef<str>) {
        let line = self.paint(Tone::Progress, msg.as_ref());
        self.write(&format!("\r{}", line));
    }

    /// Terminate a progress line so later output starts cleanly
    pub fn end_progress(&self) {
        self.write("\n");
    }

    /// One line of plain text
    pub fn line(&self, text: impl AsRef<str>) {
        self.write(&format!("{}\n", text.as_ref()));
    }

    /// Plain text exactly as given
    pub fn raw(&self, text: impl AsRef<str>) {
        self.write(text.as_ref());
    }

    pub fn blank(&self) {
        self.write("\n");
    }
}

/// Shared in-memory buffer behind [`Terminal::capture`]
#[derive(Debug, Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(io::Error::new(io::ErrorKind::Other, "capture poisoned")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
