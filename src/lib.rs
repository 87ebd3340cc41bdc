//! BharatConnect AI: conversational government scheme discovery.

pub mod api;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod delivery;
pub mod eligibility;
pub mod error;
pub mod governor;
pub mod llm;
pub mod profile;
pub mod safety;
pub mod session;

pub use error::{Error, Result};
