pub mod analyze;
pub mod discover;
pub mod embed;
pub mod scrape;

/// Max items one stage pass pulls from the store.
pub(crate) const BATCH_LIMIT: u32 = 500;
