//! OAuth2-authorized Google Sheets access with a local token cache.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod sheets;
