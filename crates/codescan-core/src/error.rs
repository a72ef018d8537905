// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Codescan.

use thiserror::Error;

use crate::types::PageCodes;

/// Top-level error type for all Codescan operations.
#[derive(Debug, Error)]
pub enum CodescanError {
    // -- Malformed input --
    #[error("unreadable image: {0}")]
    UnreadableImage(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    // -- Decoding engine --
    #[error("decoding engine failed: {0}")]
    Engine(String),

    // -- Cleanup tool (recovered inside the page pipeline) --
    #[error("cleanup failed: {0}")]
    Cleanup(String),

    #[error("operation cancelled")]
    Cancelled,

    // -- Environment --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CodescanError>;

/// How an error propagates through a document run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unreadable image or unparseable document. Aborts the document.
    MalformedInput,
    /// The decoding engine reported an internal failure. Aborts the page.
    Engine,
    /// Best-effort cleanup failed. Recovered locally, never unwinds.
    Cleanup,
    /// The caller cancelled the run.
    Cancelled,
    /// I/O, configuration or worker failures outside the pipeline proper.
    Environment,
}

/// Classify a `CodescanError` for propagation decisions.
pub fn classify(err: &CodescanError) -> ErrorClass {
    match err {
        CodescanError::UnreadableImage(_)
        | CodescanError::PdfError(_)
        | CodescanError::UnsupportedDocument(_) => ErrorClass::MalformedInput,
        CodescanError::Engine(_) => ErrorClass::Engine,
        CodescanError::Cleanup(_) => ErrorClass::Cleanup,
        CodescanError::Cancelled => ErrorClass::Cancelled,
        CodescanError::Config(_)
        | CodescanError::Worker(_)
        | CodescanError::Serialization(_) => ErrorClass::Environment,
        CodescanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                ErrorClass::MalformedInput
            }
            _ => ErrorClass::Environment,
        },
    }
}

impl CodescanError {
    /// Shorthand for `classify(self)`.
    pub fn class(&self) -> ErrorClass {
        classify(self)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CodescanError::Cancelled)
    }
}

/// A document run that stopped early.
///
/// Carries every page result completed before the failure alongside the error
/// that stopped the run.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct PartialScan {
    /// Results of the page images that finished before the failure.
    pub pages: PageCodes,
    #[source]
    pub error: CodescanError,
}

impl PartialScan {
    pub fn new(pages: PageCodes, error: CodescanError) -> Self {
        Self { pages, error }
    }

    /// A failure before any page produced a result.
    pub fn empty(error: CodescanError) -> Self {
        Self {
            pages: PageCodes::new(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_variants() {
        let err = CodescanError::UnreadableImage("bad magic".into());
        assert_eq!(classify(&err), ErrorClass::MalformedInput);
        let err = CodescanError::PdfError("no trailer".into());
        assert_eq!(classify(&err), ErrorClass::MalformedInput);
        let err = CodescanError::UnsupportedDocument("no page tree".into());
        assert_eq!(classify(&err), ErrorClass::MalformedInput);
    }

    #[test]
    fn cancellation_is_distinct() {
        let err = CodescanError::Cancelled;
        assert_eq!(err.class(), ErrorClass::Cancelled);
        assert!(err.is_cancelled());
        assert!(!CodescanError::Engine("boom".into()).is_cancelled());
    }

    #[test]
    fn io_kind_decides_class() {
        let eof = CodescanError::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        assert_eq!(eof.class(), ErrorClass::MalformedInput);
        let denied = CodescanError::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(denied.class(), ErrorClass::Environment);
    }

    #[test]
    fn partial_scan_displays_inner_error() {
        let mut pages = PageCodes::new();
        pages.insert(1, vec!["A".to_string()]);
        let partial = PartialScan::new(pages, CodescanError::Engine("crashed".into()));
        assert_eq!(partial.to_string(), "decoding engine failed: crashed");
        assert_eq!(partial.pages[&1], vec!["A".to_string()]);
    }
}
