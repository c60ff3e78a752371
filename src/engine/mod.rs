pub mod engine;
pub mod export;
pub mod extract;
pub mod protocol;
pub mod repair;

pub mod llm_client;
pub mod name_cache;
pub mod pipeline;
pub mod prompt_builder;
