pub mod ai;
pub mod body;
pub mod prompts;
pub mod stats;
