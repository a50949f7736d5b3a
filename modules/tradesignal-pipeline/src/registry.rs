use std::collections::BTreeMap;
use std::sync::Arc;

use tradesignal_common::PipelineError;

use crate::traits::NewsSource;

/// Name → source module lookup. Sources are registered once at startup;
/// iteration order is stable (alphabetical) so discovery runs and scraper
/// stats are deterministic.
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn NewsSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
        }
    }

    pub fn register(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.sources.insert(source.name().to_string(), source);
        self
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn NewsSource>, PipelineError> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownSource(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn NewsSource>)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
