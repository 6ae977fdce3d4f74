//! Report output: console text and JSON files

pub mod json;
pub mod text;
