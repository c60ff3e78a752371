pub mod defaults;
pub mod game_spec;
pub mod llm_decode;
pub mod message;
pub mod recovery;
