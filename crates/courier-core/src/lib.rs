//! # courier-core
//!
//! Core types, traits, configuration, and error handling for the Courier relay.

pub mod config;
pub mod error;
pub mod message;
pub mod traits;
