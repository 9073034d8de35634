pub mod cli;
pub mod config;
pub mod emitter;
pub mod query;
pub mod runner;
