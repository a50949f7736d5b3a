pub mod classifier;
pub mod embedder;
pub mod orchestrator;
pub mod registry;
pub mod sources;
pub mod stages;
pub mod status;
pub mod store_impl;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use orchestrator::{Pipeline, PipelineBuilder};
pub use registry::SourceRegistry;
pub use status::{CancelFlag, PipelineStatus, StatusTracker};
pub use traits::{ArticleClassifier, EmbeddingProvider, NewsSource, PipelineStore};
