//! Format-independent reading infrastructure.
//!
//! This module provides the owned markup tree used by the RSML reader and
//! writer and by candidate validation, date recognition for file names and
//! image labels, and the shared error type.

pub mod date;
pub mod parsing_error;
pub mod xml;

pub use parsing_error::{ParsingError, ParsingErrorType};
pub use xml::{XmlElement, XmlNode};
