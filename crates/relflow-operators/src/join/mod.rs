//! Join operator specs and built-in join functions.

pub mod field;
pub mod stream_table;
