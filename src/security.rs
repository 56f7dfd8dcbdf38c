//! Security module for read-only query validation.

mod validation;

pub use validation::{has_select_prefix, SelectQueryValidator};
