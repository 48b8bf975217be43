use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;


// =#========================================================================#=
// PARSING ERROR TYPE
// =#========================================================================#=
/// Error types that can occur while reading markup and RSML content
#[derive(Error, PartialEq, Debug, Clone)]
pub enum ParsingErrorType {
    #[error("IO error - {0}")]
    Io(String),
    #[error("Malformed XML - {0}")]
    MalformedXml(String),
    #[error("Missing <{0}> element")]
    MissingElement(String),
    #[error("Invalid number `{value}` for {field}")]
    InvalidNumber { field: String, value: String },
    #[error("Root `{0}` has no geometry points")]
    EmptyGeometry(String),
}


// =#========================================================================#=
// PARSING ERROR
// =#========================================================================#=
/// Parsing error with contextual information (file and element path)
#[derive(Debug, Clone, PartialEq)]
pub struct ParsingError {
    kind: ParsingErrorType,
    path: Option<PathBuf>,
    context: String,
}

impl ParsingError {
    /// Create a ParsingError from an error type and a context description
    pub fn new(kind: ParsingErrorType, context: impl Into<String>) -> Self {
        Self { kind, path: None, context: context.into() }
    }

    /// Attaches the file the error occurred in
    pub fn in_file(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Convenience constructor for MalformedXml
    pub fn malformed_xml(msg: impl fmt::Display) -> Self {
        Self::new(ParsingErrorType::MalformedXml(msg.to_string()), "")
    }

    /// Convenience constructor for MissingElement
    pub fn missing_element(name: &str, context: impl Into<String>) -> Self {
        Self::new(ParsingErrorType::MissingElement(name.to_string()), context)
    }

    /// Convenience constructor for InvalidNumber
    pub fn invalid_number(field: &str, value: &str, context: impl Into<String>) -> Self {
        let kind = ParsingErrorType::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        };
        Self::new(kind, context)
    }

    /// Convenience constructor for EmptyGeometry
    pub fn empty_geometry(root_id: &str) -> Self {
        Self::new(ParsingErrorType::EmptyGeometry(root_id.to_string()), "")
    }

    /// Get the error kind
    pub fn kind(&self) -> &ParsingErrorType {
        &self.kind
    }

    /// Get the file the error occurred in, if known
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, " in {}", path.display())?;
        }

        if !self.context.is_empty() {
            write!(f, "\n  Context: {}", self.context)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParsingError {}

impl From<std::io::Error> for ParsingError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ParsingErrorType::Io(error.to_string()), "")
    }
}

impl From<quick_xml::Error> for ParsingError {
    fn from(error: quick_xml::Error) -> Self {
        Self::malformed_xml(error)
    }
}
