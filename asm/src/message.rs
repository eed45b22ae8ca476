use color_print::{cformat, cprintln};
use serde::Serialize;

/// Annotation severity. Ordered so that a later, weaker annotation never
/// replaces a stronger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Severity {
    #[default]
    None,
    Info,
    Warning,
    ErrorWeak,
    Error,
}

impl Severity {
    pub fn is_error(&self) -> bool {
        *self >= Severity::ErrorWeak
    }
}

/// Severity and message carried by every token and expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Note {
    severity: Severity,
    message: Option<String>,
}

impl Note {
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_set(&self) -> bool {
        self.severity != Severity::None
    }

    pub fn has_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Escalate to `severity`; equal or weaker severities are ignored.
    pub fn set(&mut self, severity: Severity, message: impl Into<String>) {
        if severity > self.severity {
            self.severity = severity;
            self.message = Some(message.into());
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.set(Severity::Error, message);
    }

    pub fn error_weak(&mut self, message: impl Into<String>) {
        self.set(Severity::ErrorWeak, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.set(Severity::Warning, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.set(Severity::Info, message);
    }
}

/// A flattened annotation, located in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub severity: Severity,
    pub message: String,
    /// Text of the line the span refers to (the expanded text for macro lines).
    pub source: String,
}

impl Diagnostic {
    /// Print with file location and the offending line underlined.
    pub fn print(&self) {
        match self.severity {
            Severity::Error | Severity::ErrorWeak => {
                cprintln!("<red,bold>error</>: {}", self.message)
            }
            Severity::Warning => cprintln!("<yellow,bold>warn</>: {}", self.message),
            Severity::Info | Severity::None => cprintln!("<green,bold>note</>: {}", self.message),
        }
        let line_num = self.line + 1;
        cprintln!(
            "     <blue>--></> <underline>{}:{}:{}</>",
            self.path,
            line_num,
            self.start + 1
        );
        cprintln!("      <blue>|</>");
        cprintln!(" <blue>{:>4} |</> {}", line_num, self.source);
        let width = self.end.saturating_sub(self.start).max(1);
        let marker = cformat!("<red>{}</>", "^".repeat(width));
        cprintln!("      <blue>|</> {}{}", " ".repeat(self.start), marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_only_escalates() {
        let mut note = Note::default();
        note.warning("odd");
        assert_eq!(note.severity(), Severity::Warning);
        note.error("bad");
        note.warning("later");
        note.info("later still");
        assert_eq!(note.severity(), Severity::Error);
        assert_eq!(note.message(), Some("bad"));
    }

    #[test]
    fn weak_error_is_error() {
        let mut note = Note::default();
        note.error_weak("maybe");
        assert!(note.has_error());
        assert!(Severity::Error > Severity::ErrorWeak);
    }
}
