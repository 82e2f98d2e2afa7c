//! Concrete [`LlmClient`](crate::workflow::provider::LlmClient)
//! implementations.

pub mod openai;

pub use openai::OpenAiClient;
