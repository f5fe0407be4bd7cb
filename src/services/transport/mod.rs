pub mod client;
pub mod valkey;

pub use client::{Transport, TransportError};
pub use valkey::ValkeyTransport;
