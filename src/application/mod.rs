//! Application layer - services that drive a `MediaExtractor`.

pub mod hub;
pub mod service;

pub use hub::{DownloadHub, Subscription};
pub use service::DownloadService;
