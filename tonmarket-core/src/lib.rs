#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod account;
pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod processors;
pub mod store;
pub mod transport;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_support;
