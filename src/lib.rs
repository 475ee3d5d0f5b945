//! Community-management bot core: command and passive-reaction dispatch,
//! persisted role reactables, audit logging, and GDPR compliance tooling.
//! The binary in `main.rs` wires these modules to a live gateway client.

pub mod audit;
pub mod bulk;
pub mod commands;
pub mod compliance;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod host;
pub mod registry;
pub mod reply;
pub mod store;
pub mod worker;
