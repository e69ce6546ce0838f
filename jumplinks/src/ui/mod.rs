// jumplinks/src/ui/mod.rs
//! Terminal presentation: colour themes and formatted writers.

pub mod output_format;
pub mod theme;
