pub mod config;
pub mod error;
pub mod hash;
pub mod text;
pub mod types;

pub use config::Config;
pub use error::PipelineError;
pub use hash::hash_url;
pub use text::clean_article_text;
pub use types::*;
