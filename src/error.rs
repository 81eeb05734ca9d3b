use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::interpreter::value::Value;
use crate::scanner::token::Span;

// ============= Compile-time errors (with miette diagnostics) =============

#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    #[error("scan error: {message}")]
    #[diagnostic(code(quill::scan))]
    Scan {
        message: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("parse error: {message}")]
    #[diagnostic(code(quill::parse))]
    Parse {
        message: String,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl CompileError {
    pub fn scan(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::Scan {
            message: message.into(),
            span: SourceSpan::new(offset.into(), len),
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    pub fn parse(message: impl Into<String>, offset: usize, len: usize) -> Self {
        Self::Parse {
            message: message.into(),
            span: SourceSpan::new(offset.into(), len),
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    /// Attach source code for fancy miette diagnostics
    pub fn with_source_code(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        let src = miette::NamedSource::new(name.into(), source.into());
        match self {
            Self::Scan { message, span, .. } => Self::Scan { message, span, src },
            Self::Parse { message, span, .. } => Self::Parse { message, span, src },
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Self::Scan { span, .. } | Self::Parse { span, .. } => span.offset(),
        }
    }
}

// ============= Runtime errors (simple, no miette) =============

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("{message}")]
    Error { message: String, span: Option<Span> },

    /// Unwinds an `exit` statement out of nested loops and branches.
    #[error("exit")]
    Exit { value: Value },
}

impl RuntimeError {
    /// Create a runtime error with source span
    pub fn with_span(message: impl Into<String>, span: Span) -> Self {
        Self::Error {
            message: message.into(),
            span: Some(span),
        }
    }

    /// Format error with line number (requires source code)
    pub fn display_with_line(&self, source: &str) -> String {
        match self {
            Self::Error {
                message,
                span: Some(span),
            } => format!("line {}: {}", offset_to_line(source, span.offset), message),
            Self::Error {
                message,
                span: None,
            } => message.clone(),
            Self::Exit { .. } => "unexpected exit".to_string(),
        }
    }
}

// ============= Shell errors (one per pipeline stage) =============

/// Everything that can stop one pass of the execution shell.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("could not read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", join_compile_errors(.0))]
    Lex(Vec<CompileError>),

    #[error("{}", join_compile_errors(.0))]
    Syntax(Vec<CompileError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ShellError {
    /// One-line description, with line numbers where the error has a position.
    pub fn describe(&self, source: &str) -> String {
        match self {
            Self::Io { .. } => self.to_string(),
            Self::Lex(errors) | Self::Syntax(errors) => errors
                .iter()
                .map(|e| format!("line {}: {e}", offset_to_line(source, e.offset())))
                .collect::<Vec<_>>()
                .join("; "),
            Self::Runtime(e) => e.display_with_line(source),
        }
    }
}

fn join_compile_errors(errors: &[CompileError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Calculate line number from byte offset in source
fn offset_to_line(source: &str, offset: usize) -> usize {
    source.as_bytes()[..offset.min(source.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

// ============= Tests =============
