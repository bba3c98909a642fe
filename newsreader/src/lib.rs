// Library interface for newsreader modules
// This allows tests and the binary to import modules

pub mod extraction;
pub mod fetching;
pub mod llm;
pub mod prompts;
pub mod server;
pub mod sessions;
