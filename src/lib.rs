pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod github;
pub mod install;
pub mod manifest;
pub mod model;
pub mod parsers;
pub mod patterns;
pub mod pipeline;
pub mod reports;
pub mod runner;
pub mod store;
