//! AlooChat: chat assistant with a tool-using agent.
//!
//! Each user turn makes two language-model calls: one to pick a tool
//! (weather, GitHub, Wikipedia, Giphy or a generic HTTP client) and one
//! to phrase the reply around its result. Failures degrade the reply
//! instead of surfacing as errors.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod render;
pub mod state;
pub mod tools;
pub mod types;
