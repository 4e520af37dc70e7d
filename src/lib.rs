pub mod api;
pub mod clients;
pub mod config;
pub mod models;
pub mod persistence;
pub mod processor;
pub mod services;
