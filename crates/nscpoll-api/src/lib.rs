// nscpoll-api: Async Rust client for the NSClient++ REST API

pub mod client;
pub mod error;
pub mod status;
pub mod transport;

pub use client::{AgentClient, INFO_PATH, command_path};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
