//! Adapters - Concrete implementations of ports.

pub mod fixture;
pub mod http;
pub mod ytdlp;
