//! Opportunity Scout - resilient niche discovery for experience marketplaces
//!
//! Two halves:
//! - Circuit breakers guarding every outbound service call, with state that
//!   can be shared between processes through a key-value store.
//! - A recursive optimizer that asks a language model for niche
//!   opportunities, validates them against keyword and inventory data,
//!   learns from the scores, and narrows its search over several iterations.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
