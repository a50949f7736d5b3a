pub mod openai;
pub mod traits;

pub use openai::{OpenAi, StructuredOutput};
pub use traits::EmbedAgent;
