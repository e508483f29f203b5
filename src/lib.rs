//! Account/authentication API daemon.
//!
//! A small HTTP service exposing a JSON account-management API: a regex route
//! table with role-based authorization gating, a dispatcher that resolves each
//! request to exactly one handler, and a file-persisted user/role/session
//! directory shared with the offline CLI tools.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod logger;
pub mod store;
