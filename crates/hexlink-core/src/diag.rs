//! Numbered warning and error messages collected during a session
//!
//! Every entry is stored pre-rendered as `"<n> Warning: <text>"` or
//! `"<n> Error: <text>"`, with `n` counting from 1 within its own list.
//! Nothing is ever removed; a session is judged successful when
//! [`Diagnostics::error_count`] is zero.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Append-only collection of warnings and errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a warning
    pub fn add_warning(&mut self, text: impl AsRef<str>) {
        let entry = format!("{} Warning: {}", self.warnings.len() + 1, text.as_ref());
        log::debug!("{}", entry);
        self.warnings.push(entry);
    }

    /// Append an error
    pub fn add_error(&mut self, text: impl AsRef<str>) {
        let entry = format!("{} Error: {}", self.errors.len() + 1, text.as_ref());
        log::debug!("{}", entry);
        self.errors.push(entry);
    }

    /// Number of warnings collected so far
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of errors collected so far
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// True when no error has been recorded
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Rendered warnings in the order they were added
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Rendered errors in the order they were added
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Append all messages of `other`, renumbering them after ours
    pub fn merge(&mut self, other: &Diagnostics) {
        for w in &other.warnings {
            self.add_warning(strip_prefix(w, " Warning: "));
        }
        for e in &other.errors {
            self.add_error(strip_prefix(e, " Error: "));
        }
    }
}

/// Drop the `"<n> Warning: "` part of a rendered entry
fn strip_prefix<'a>(entry: &'a str, marker: &str) -> &'a str {
    entry
        .split_once(marker)
        .map(|(_, text)| text)
        .unwrap_or(entry)
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in &self.warnings {
            writeln!(f, "{}", w)?;
        }
        for e in &self.errors {
            writeln!(f, "{}", e)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_numbering_is_per_list() {
        let mut diag = Diagnostics::new();
        diag.add_warning("first");
        diag.add_error("broken");
        diag.add_warning("second");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.warnings()[0], "1 Warning: first");
        assert_eq!(diag.warnings()[1], "2 Warning: second");
        assert_eq!(diag.errors()[0], "1 Error: broken");
        assert!(!diag.is_ok());
    }

    #[test]
    fn test_no_deduplication() {
        let mut diag = Diagnostics::new();
        diag.add_error("same");
        diag.add_error("same");
        assert_eq!(diag.error_count(), 2);
        assert_eq!(diag.errors()[1], "2 Error: same");
    }

    #[test]
    fn test_merge_renumbers() {
        let mut a = Diagnostics::new();
        a.add_error("decode");
        let mut b = Diagnostics::new();
        b.add_error("encode");
        b.add_warning("note: with colon");

        a.merge(&b);
        assert_eq!(a.errors()[1], "2 Error: encode");
        assert_eq!(a.warnings()[0], "1 Warning: note: with colon");
    }

    #[test]
    fn test_display_lists_everything() {
        let mut diag = Diagnostics::new();
        diag.add_warning("w");
        diag.add_error("e");
        assert_eq!(diag.to_string(), "1 Warning: w\n1 Error: e\n");
    }
}
