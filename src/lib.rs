//! commbench: one user registry behind three transports.
//!
//! - Raw TCP text binding (stateless uppercase transform)
//! - HTTP/JSON CRUD binding
//! - Framed RPC CRUD binding served by a fixed worker pool
//!
//! plus a harness that measures and ranks their round-trip latency.

pub mod bench;
pub mod bindings;
pub mod config;
pub mod logging;
pub mod net;
pub mod registry;
pub mod server;
pub mod transform;
