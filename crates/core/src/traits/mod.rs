//! Traits at the seams between the dispatch agent and external providers

pub mod extractor;

pub use extractor::{ExtractorError, ProviderOutput, StructuredExtractor};
