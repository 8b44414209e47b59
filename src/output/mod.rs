//! Result presentation
//!
//! `text` renders the human-readable lines printed after each run; `json`
//! renders the single machine-readable report printed at session end.

pub mod json;
pub mod text;
