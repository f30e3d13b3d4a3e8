//! Addressing and operation types.
//!
//! Canonical string forms:
//! - CRUD URL: `scheme://[authority]/module/instance[/selector...]`, or a bare
//!   path using the `x-in-process` scheme
//! - Entity id: `module.Name`, derived from the first two path segments
//! - Operation: one of `create`, `delete`, `execute`, `get`, `is_valid`,
//!   `update`, `upsert`, matched case-insensitively

mod address;
mod entity_id;
mod operation;

pub use address::{
    AddressPath, CrudUrl, DEFAULT_SCHEME, filter_control_chars, replace_non_word_chars,
};
pub use entity_id::EntityId;
pub use operation::Operation;
