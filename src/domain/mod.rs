//! Domain layer - records, file naming and progress scraping.

pub mod download;
pub mod metadata;
pub mod progress;
