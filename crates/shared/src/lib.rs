//! Wire types shared by the funnel demo server and its clients.

pub mod domain;
pub mod error;
pub mod protocol;

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
