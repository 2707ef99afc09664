//! Integration tests for tradews-ws.
//!
//! These run a real client against an in-process mock exchange.

pub mod common;
