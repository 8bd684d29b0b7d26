pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod mcp;
pub mod middleware;
pub mod services;
