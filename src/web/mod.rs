//! Helpers consumed by the web frontend's handlers and templates.

pub mod urls;
