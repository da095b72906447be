pub mod actions;
pub mod counts;
pub mod events;
pub mod fetcher;
pub mod orchestrator;
pub mod status;
