pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod lineage;
pub mod middleware;
pub mod models;
pub mod router;
pub mod services;
