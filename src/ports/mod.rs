//! Trait seams between the application layer and its backends.

pub mod extractor;

pub use extractor::{MediaExtractor, ProgressSink};
