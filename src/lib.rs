//! Telegram channel preview API.
//!
//! Fetches the public `t.me/s/<channel>` preview page, extracts the channel
//! profile and its most recent messages, and serves them as JSON.

pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod normalize;
pub mod parser;
pub mod selection;
pub mod web;
