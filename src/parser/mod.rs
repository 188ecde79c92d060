//! Per-page-shape parsers. Each one fills in a record the sidebar walker
//! already created; missing markup is skipped, never an error.

pub mod content;
pub mod enums;
pub mod function;
pub mod structure;
pub mod summary;
