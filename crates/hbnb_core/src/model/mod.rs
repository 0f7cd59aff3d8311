//! Record model and entity kinds.
//!
//! # Responsibility
//! - Define the single record shape used by every entity kind.
//! - Resolve kind names to factories without reflection.
//!
//! # Invariants
//! - Every record is addressed by `<type_name>.<id>`.
//! - Kinds carry no fields of their own; attributes live on the record.

pub mod kind;
pub mod record;
