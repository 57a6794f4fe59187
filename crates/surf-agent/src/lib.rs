//! Surf agent: serves conditions reports over HTTP and keeps them warm

pub mod api;
pub mod config;
