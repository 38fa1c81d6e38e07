//! # courier-channels
//!
//! Chat network adapters for Courier.

pub mod telegram;
