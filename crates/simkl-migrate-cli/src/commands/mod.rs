pub mod config;
pub mod export;
pub mod migrate;
pub mod progress;
pub mod prompts;
pub mod session;
