//! Error types for stylesheet parsing and color maps.

use cssparser::{BasicParseErrorKind, ParseErrorKind, SourceLocation};
use thiserror::Error;

/// A stylesheet that could not be parsed.
///
/// Lines and columns are both 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    /// Line of the offending token.
    pub line: u32,
    /// Column of the offending token.
    pub column: u32,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    pub(crate) fn at(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            line: location.line + 1,
            column: location.column,
            message: message.into(),
        }
    }
}

/// Structural problems detected on top of what the tokenizer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Malformed {
    StrayClosingBracket,
    BadString,
    BadUrl,
    EmptySelector,
    UnclosedBlock,
}

impl std::fmt::Display for Malformed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformed::StrayClosingBracket => write!(f, "unbalanced closing bracket"),
            Malformed::BadString => write!(f, "unterminated string"),
            Malformed::BadUrl => write!(f, "malformed url()"),
            Malformed::EmptySelector => write!(f, "rule without a selector"),
            Malformed::UnclosedBlock => write!(f, "unclosed block"),
        }
    }
}

impl<'i> From<cssparser::ParseError<'i, Malformed>> for ParseError {
    fn from(err: cssparser::ParseError<'i, Malformed>) -> Self {
        let message = match err.kind {
            ParseErrorKind::Basic(kind) => describe(kind),
            ParseErrorKind::Custom(malformed) => malformed.to_string(),
        };
        ParseError::at(err.location, message)
    }
}

fn describe(kind: BasicParseErrorKind<'_>) -> String {
    match kind {
        BasicParseErrorKind::UnexpectedToken(token) => format!("unexpected token {:?}", token),
        BasicParseErrorKind::EndOfInput => "unexpected end of input".to_string(),
        BasicParseErrorKind::AtRuleInvalid(name) => format!("invalid @{} rule", name.as_ref()),
        BasicParseErrorKind::AtRuleBodyInvalid => "invalid at-rule body".to_string(),
        BasicParseErrorKind::QualifiedRuleInvalid => "invalid rule".to_string(),
    }
}

/// Errors raised while reading a color map.
#[derive(Debug, Error)]
pub enum ColorMapError {
    /// The payload is valid JSON but not a stylesheet → selector → property → color map.
    #[error("invalid color map: {0}")]
    Invalid(String),

    /// The payload is not valid JSON.
    #[error("malformed color map JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ColorMapError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
