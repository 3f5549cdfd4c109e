//! vidpull - fetch media metadata and stream download progress over HTTP
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (metadata records, progress parsing, file naming)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations (yt-dlp, fixture, HTTP)
//! - application/: Download supervision and progress fan-out
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::{AppConfig, Backend};
pub use error::{Error, Result};
