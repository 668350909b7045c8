//! Diagnostic creation, severity management, and rendering.
//!
//! Every failure and every integrity finding of a run is reported as a
//! [`Diagnostic`]: a severity, a category-prefixed [`DiagnosticCode`], a
//! message, a primary [`Span`](mend_source::Span) into the manifest, and
//! optional labels, notes and help. The [`DiagnosticSink`] collects them
//! during a run and a [`DiagnosticRenderer`] formats them for the terminal
//! or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
