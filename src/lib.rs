//! Solace — guided-flow core for the wellness companion app.

pub mod config;
pub mod error;
pub mod flow;
pub mod score;
pub mod validators;
