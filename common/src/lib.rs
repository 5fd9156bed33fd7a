//! Shared types and configuration for the pagecap capture server.

pub mod config;
pub mod protocol;
pub mod record;
