//! Convplan: type-directed conversion planning.
//!
//! Discovers the record graph on both sides of a conversion, pairs records
//! and fields by name, and resolves every field pair through an ordered
//! rule set into a conversion plan.

pub mod cli;
pub mod core;
