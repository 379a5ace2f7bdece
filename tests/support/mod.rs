//! Shared helpers for integration tests.
//!
//! Each test binary pulls in only what it needs, so unused helpers are expected.
#![allow(dead_code)]

pub mod range_server;
pub mod socket_guard;
