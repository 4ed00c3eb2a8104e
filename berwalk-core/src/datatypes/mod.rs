//! Field registrations and the values decoders attach to them

pub mod field_info;
pub mod field_value;

pub use field_info::{FieldInfo, FieldKind, FieldRef};
pub use field_value::FieldValue;
