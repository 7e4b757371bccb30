pub mod catalog;
pub mod config;
pub mod send;
pub mod sessions;
