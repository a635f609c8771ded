//! Infrastructure layer: storage backends for the domain repository traits

pub mod cache;

pub use cache::{FileResultCache, MemoryResultCache};
