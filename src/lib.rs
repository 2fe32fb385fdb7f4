//! Session-cookie key handling for the room server's web frontend.
//! Key material is persisted on disk so sessions survive restarts, and the
//! helpers here stay small and transparent so the security-relevant logic
//! remains readable in-repo.

pub mod keys;
pub mod repo;
pub mod web;
