pub mod config;
pub mod embed;
pub mod engine;
pub mod flight;
pub mod search;
pub mod vector;
