#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::trivially_copy_pass_by_ref)]

//! # mtctl
//!
//! Operator console for Motor Town dedicated servers.
//!
//! Keeps a registry of named server instances (address, port, admin
//! password) and drives the server's HTTP admin API from an interactive
//! prompt: chat broadcast, player and ban lists, kick/ban/unban, version and
//! housing queries.
//!
//! ## Subcommands
//!
//! - `mtctl configure`: add, edit and delete registry entries
//! - `mtctl connect [NAME]`: open an admin session against one instance
//!
//! ## Architecture
//!
//! ```text
//! main.rs       entry point, clap subcommands, tracing setup
//! validate.rs   field validators and secret masking
//! config.rs     InstanceRecord, Registry, instances.toml load/save
//! envelope.rs   response envelope and untyped `data` payload
//! client.rs     AdminClient: one method per admin API call
//! console.rs    line I/O and bounded-retry prompting
//! session.rs    command parser, dispatcher and renderers
//! wizard.rs     registry configuration menu
//! error.rs      top-level error for the drivers
//! ```

pub mod client;
pub mod config;
pub mod console;
pub mod envelope;
pub mod error;
pub mod session;
pub mod validate;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use client::{AdminClient, AdminRequest, ClientError};
pub use config::{InstanceRecord, Registry, RegistryError};
pub use envelope::{Envelope, Payload};
pub use error::Error;
