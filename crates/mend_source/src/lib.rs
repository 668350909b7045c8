//! Manifest text management and byte-range tracking for diagnostics.
//!
//! The parser records every record it recognises as a [`TextRange`] into the
//! raw manifest text. The [`SourceDb`] owns the loaded text and turns a
//! [`Span`] (file + range) into a [`ResolvedSpan`] with line/column
//! coordinates when a diagnostic is rendered.

#![warn(missing_docs)]

pub mod file_id;
pub mod range;
pub mod resolved_span;
pub mod source_db;
pub mod source_file;
pub mod span;

pub use file_id::FileId;
pub use range::TextRange;
pub use resolved_span::ResolvedSpan;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
pub use span::Span;
