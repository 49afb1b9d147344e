pub mod cli;
pub mod clients;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod layout;
pub mod models;
pub mod selection;
pub mod state;
