use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use qualgen_ir::{QError, QResult};

/// An optional `.smt2` transcript of everything sent to and received from
/// the solver subprocess, for offline replay when a run needs debugging.
/// Writing is best-effort but failures are still surfaced, not swallowed:
/// a requested log the pipeline can't actually produce is an input error,
/// the same stance chalk-repl takes on `--program` paths it can't open
/// (`chalk-repl/src/main.rs`'s `File::open(filename)?`).
pub struct DialogueLog {
    file: Option<std::fs::File>,
}

impl DialogueLog {
    pub fn disabled() -> DialogueLog {
        DialogueLog { file: None }
    }

    pub fn open(path: &Path) -> QResult<DialogueLog> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(QError::Io)?;
        Ok(DialogueLog { file: Some(file) })
    }

    pub fn sent(&mut self, line: &str) {
        self.write_tagged(";; >", line);
    }

    pub fn received(&mut self, line: &str) {
        self.write_tagged(";; <", line);
    }

    fn write_tagged(&mut self, tag: &str, line: &str) {
        if let Some(file) = &mut self.file {
            // A log is a debugging convenience; losing a line to a full
            // disk shouldn't abort an otherwise-successful solve, so
            // failures here are dropped rather than propagated.
            let _ = writeln!(file, "{} {}", tag, line);
        }
    }
}
