//! Core types for the berwalk BER decoding engine
//!
//! This crate provides the pieces shared by every decoder: the structural
//! error type, the [`Tvb`] byte view, the field tree decoders build, the
//! diagnostics they record, decoder configuration and the object identifier
//! text codec.

pub mod config;
pub mod datatypes;
pub mod diagnostic;
pub mod error;
pub mod oid;
pub mod tree;
pub mod tvb;

pub use config::DecodeConfig;
pub use datatypes::{FieldInfo, FieldKind, FieldRef, FieldValue};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use error::{BerError, BerResult};
pub use oid::ObjectIdentifier;
pub use tree::{FieldNode, FieldTree, NodeId, TreeCheckpoint};
pub use tvb::Tvb;
