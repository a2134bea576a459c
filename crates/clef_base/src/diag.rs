//! The diagnostics sink.
//!
//! Every error, warning and note produced while processing a
//! translation unit lands here.  Diagnostics are accumulated in source
//! order and rendered as
//!
//! ```text
//! <file>:<line>:<col>: <severity>: <message>
//! ```
//!
//! one per line.  The sink also keeps the error and warning counters
//! the driver uses to decide the exit code: the analyzer never stops at
//! the first problem, it records the diagnostic, types the offending
//! node with the error sentinel and keeps going.

use crate::loc::{FileId, Loc, SourceMap};
use std::fmt;

/// Diagnostic severity, in increasing order of badness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub loc: Loc,
    pub severity: Severity,
    pub message: String,
}

/// Accumulating diagnostics sink with error/warning counters.
#[derive(Default)]
pub struct Diagnostics {
    files: SourceMap,
    entries: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file name for use in locations.
    pub fn add_file(&mut self, name: &str) -> FileId {
        self.files.add_file(name)
    }

    /// Resolves a file id back to its name.
    pub fn file_name(&self, id: FileId) -> &str {
        self.files.name(id)
    }

    pub fn error(&mut self, loc: Loc, message: impl Into<String>) {
        self.errors += 1;
        self.push(loc, Severity::Error, message.into());
    }

    pub fn warning(&mut self, loc: Loc, message: impl Into<String>) {
        self.warnings += 1;
        self.push(loc, Severity::Warning, message.into());
    }

    pub fn note(&mut self, loc: Loc, message: impl Into<String>) {
        self.push(loc, Severity::Note, message.into());
    }

    fn push(&mut self, loc: Loc, severity: Severity, message: String) {
        self.entries.push(Diagnostic {
            loc,
            severity,
            message,
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Renders one diagnostic in the `file:line:col: severity: message`
    /// format.
    pub fn render(&self, d: &Diagnostic) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            self.files.name(d.loc.file),
            d.loc.line,
            d.loc.column,
            d.severity,
            d.message
        )
    }

    /// Renders every diagnostic, one per line, in emission order.
    pub fn render_all(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&self.render(d));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(diags: &mut Diagnostics, line: u32, column: u32) -> Loc {
        let file = diags.add_file("t.c");
        Loc::new(file, line, column)
    }

    #[test]
    fn counters_track_severities() {
        let mut diags = Diagnostics::new();
        let at = loc(&mut diags, 1, 1);
        diags.error(at, "bad");
        diags.warning(at, "iffy");
        diags.warning(at, "iffy too");
        diags.note(at, "fyi");
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.warning_count(), 2);
        assert!(diags.has_errors());
        assert_eq!(diags.entries().len(), 4);
    }

    #[test]
    fn render_uses_file_line_col_format() {
        let mut diags = Diagnostics::new();
        let at = loc(&mut diags, 3, 14);
        diags.error(at, "unknown symbol 'x'");
        let rendered = diags.render(&diags.entries()[0]);
        assert_eq!(rendered, "t.c:3:14: error: unknown symbol 'x'");
    }

    #[test]
    fn render_all_is_one_line_per_diagnostic() {
        let mut diags = Diagnostics::new();
        let at = loc(&mut diags, 1, 1);
        diags.warning(at, "first");
        diags.error(at, "second");
        let all = diags.render_all();
        assert_eq!(all.lines().count(), 2);
        assert!(all.lines().next().unwrap().contains("warning: first"));
    }

    #[test]
    fn notes_do_not_affect_counters() {
        let mut diags = Diagnostics::new();
        let at = loc(&mut diags, 2, 2);
        diags.note(at, "previous declaration was here");
        assert_eq!(diags.error_count(), 0);
        assert_eq!(diags.warning_count(), 0);
    }
}
