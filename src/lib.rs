// Archflow - human-in-the-loop architecture analysis pipeline
// Library exports

// Core modules
pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod providers;
pub mod workflow;
