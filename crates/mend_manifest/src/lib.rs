//! Data model and parser for Xcode-style `project.pbxproj` build manifests.
//!
//! Only three tables matter for compile-unit tracking: file references,
//! build files, and the ordered file lists of sources build phases. The parser
//! locates their `/* Begin ... section */` blocks and recognises each record
//! by its complete `id = { ... };` grammar, so records that earlier edits
//! glued onto one line are still recovered one by one. Every record keeps the
//! exact byte range it was matched from; everything else in the text is
//! opaque and left untouched by downstream rewriting.
//!
//! # Architecture
//!
//! - **Scanner** (`scanner`): byte-level tokenizer for words, quoted strings,
//!   comments, dictionaries and lists.
//! - **Parser** ([`parser`]): section discovery and record extraction.
//! - **Model** ([`model`]): the typed [`Manifest`].
//! - **Render** ([`render`]): serialises new records in the grammar the parser
//!   accepts.

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod parser;
pub mod render;
mod scanner;

pub use error::{ParseError, ParseErrorKind};
pub use model::{
    BuildFileEntry, FileReference, Manifest, PhaseEntry, RefKind, Section, SectionKind,
    SourcesPhase,
};
pub use parser::parse;
