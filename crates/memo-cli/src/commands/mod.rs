//! Command handlers

pub mod config;
pub mod link;
pub mod session;
pub mod status;
