//! Company Bot: HR directory assistant for Telegram.
//!
//! Employees register by linking their chat account to a directory record,
//! then browse colleagues page by page, look them up by full name and view
//! weekly work schedules.

pub mod bot;
pub mod channels;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod presentation;
pub mod store;
