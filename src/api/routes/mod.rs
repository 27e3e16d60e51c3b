//! API route handlers

pub mod devices;
pub mod health;
pub mod run_now;
pub mod templates;
