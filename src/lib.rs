pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod infra;
pub mod mapping;
pub mod runtime;
pub mod services;
