//! End-to-end tests for the Callguard relay
//!
//! This test suite validates:
//! - Authenticated relay requests over a real TCP listener
//! - Cooldown suppression across requests and across restarts
//! - Concurrent requests racing for the same number
//! - The Twilio client against a stub provider

pub mod test_utils;



#[cfg(test)]
mod provider_tests;
