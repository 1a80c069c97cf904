//! SDK for the TON Market prediction market API.
//!
//! [`objects`] holds the wire types shared with the server. The HTTP and push
//! channel clients live in [`client`], behind the `client` cargo feature.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
