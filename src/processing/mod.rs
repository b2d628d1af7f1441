pub mod orchestrator;
pub mod state;
pub mod types;
