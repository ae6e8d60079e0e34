pub mod chat;
pub mod config;
pub mod health;
pub mod monitoring;
pub mod sessions;
