//! Field model (query-facing aliases to on-disk fields)

mod field_model;

pub use field_model::{FieldModel, ORIGINAL_COUNT_SUFFIX};
