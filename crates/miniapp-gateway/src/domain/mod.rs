//! Domain types for the gateway: configuration, errors, entities.

pub mod config;
pub mod error;
pub mod types;
