pub mod cli;
pub mod config;
pub mod git;
pub mod infrastructure;
