//! Parse and write RSML (Root System Markup Language) files.
//!
//! This module provides:
//! - [RsmlParser]: configurable reader producing a [Snapshot]
//! - [write_rsml_file] / [to_rsml_string]: writer for (reconciled) snapshots
//! - [parse_file] / [parse_str]: quick API with default configuration
//!
//! # RSML layout
//! ```text
//! <rsml>
//!   <metadata> version, unit, resolution|size, last-modified, software,
//!              user, file-key, property-definitions, image/label,
//!              observation-hours (2-D+T only) </metadata>
//!   <scene>
//!     <plant ID=".." label="..">
//!       <root ID=".." label=".." po:accession="..">
//!         <properties>, <geometry><polyline><point/></polyline></geometry>,
//!         <functions>, <annotations>, nested <root> (laterals)
//!       </root>
//!     </plant>
//!   </scene>
//! </rsml>
//! ```

pub(crate) mod defs;
mod parser;
mod writer;

pub use parser::RsmlParser;
pub use writer::{to_rsml_document, to_rsml_string, write_rsml_file};

use crate::model::Snapshot;
use crate::parser::ParsingError;
use std::path::Path;

// ============================================================================
// Quick API
// ============================================================================
/// Parses an RSML file using default settings.
///
/// # Arguments
/// * `path` - File to read
/// * `key` - Logical key of the time point the file belongs to
///
/// # Example
/// ```no_run
/// use rsmltrack::rsml;
///
/// let snapshot = rsml::parse_file("plate_17_05_2021.rsml", "plate_17_05_2021").unwrap();
/// println!("{} roots", snapshot.num_roots());
/// ```
pub fn parse_file<P: AsRef<Path>>(path: P, key: &str) -> Result<Snapshot, ParsingError> {
    RsmlParser::new().parse_file(path, key)
}

/// Parses RSML text using default settings.
pub fn parse_str(text: &str, key: &str) -> Result<Snapshot, ParsingError> {
    RsmlParser::new().parse_str(text, key)
}
