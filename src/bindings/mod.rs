//! Transport bindings.
//!
//! - `socket`: raw TCP, one uppercase transform per round trip
//! - `http`: JSON API over the shared registry
//! - `rpc`: framed RPC over the shared registry, served by a worker pool

pub mod http;
pub mod rpc;
pub mod socket;
