// jumplinks/src/lib.rs
//! # Jumplinks CLI Application
//!
//! Terminal front end for the `jumplinks-core` redirect engine. Rules,
//! mapping collections and the not-found log live in a YAML store; the
//! commands add to it, evaluate requests against it and report on it.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod store;
pub mod ui;

pub use commands::dispatch;
