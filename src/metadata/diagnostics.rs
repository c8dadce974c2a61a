//! Diagnostics collection for the marking run.
//!
//! The marking engine never logs; advisory findings (unanalyzable reflection
//! call sites, ambiguous attribute constructor matches, duplicate explicit
//! preserves, ignored unresolved references) are appended to a shared
//! [`Diagnostics`] container that the caller inspects after the run. Advisory
//! findings never block forward progress: the run completes and the output is
//! still produced on the assumption that the conservative default (keep more
//! than strictly necessary) is safe.
//!
//! The container uses `boxcar::Vec` for append-only storage, so the engine
//! can hold a shared reference while the caller retains its own handle.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trimscope::metadata::diagnostics::{Diagnostics, DiagnosticCategory};
//!
//! let diagnostics = Arc::new(Diagnostics::new());
//! diagnostics.warning(
//!     DiagnosticCategory::Reflection,
//!     "Could not analyze reflection call at IL_0014 in Ns.Widget::Run",
//! );
//! assert_eq!(diagnostics.warning_count(), 1);
//! ```

use std::fmt;

/// Severity of a diagnostic entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Informational; low-importance advisory
    Info,
    /// A finding the user should review; never blocks the run
    Warning,
    /// A failure that was tolerated by policy (e.g. ignored unresolved reference)
    Error,
}

/// The engine area a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    /// Reference resolution
    Resolution,
    /// Reflection-pattern scanning
    Reflection,
    /// Custom-attribute processing
    Attribute,
    /// Explicit preservation requests
    Preserve,
    /// General structural marking
    Marking,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCategory::Resolution => write!(f, "resolution"),
            DiagnosticCategory::Reflection => write!(f, "reflection"),
            DiagnosticCategory::Attribute => write!(f, "attribute"),
            DiagnosticCategory::Preserve => write!(f, "preserve"),
            DiagnosticCategory::Marking => write!(f, "marking"),
        }
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Originating engine area
    pub category: DiagnosticCategory,
    /// Human-readable message
    pub message: String,
}

/// Append-only container for diagnostics collected during a marking run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: boxcar::Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: boxcar::Vec::new(),
        }
    }

    /// Appends an info-severity entry.
    pub fn info(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Info, category, message);
    }

    /// Appends a warning-severity entry.
    pub fn warning(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Warning, category, message);
    }

    /// Appends an error-severity entry.
    pub fn error(&self, category: DiagnosticCategory, message: impl Into<String>) {
        self.push(DiagnosticSeverity::Error, category, message);
    }

    fn push(
        &self,
        severity: DiagnosticSeverity,
        category: DiagnosticCategory,
        message: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            severity,
            category,
            message: message.into(),
        });
    }

    /// Returns the total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Returns `true` when no diagnostics were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of warning-severity entries.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Warning)
            .count()
    }

    /// Returns the number of error-severity entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .count()
    }

    /// Returns `true` if any error-severity entry was collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Iterates over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().map(|(_, entry)| entry)
    }
}
