//! Upstream wire formats

pub mod openai;
pub mod webhook;
