//! Cost calculator for LLM pricing: a provider registry with persistent custom
//! entries, grouped search, server-side cost calculation, and a sortable model
//! comparison table.

pub mod api;
pub mod config;
pub mod cost;
pub mod grouping;
pub mod model;
pub mod registry;
pub mod render;
pub mod session;
pub mod shell;
pub mod sort;
pub mod store;
