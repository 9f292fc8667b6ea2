//! Command and query interface for the radial tree viewer.
//!
//! This crate defines a typed, serializable language for driving a
//! [`viewer::Viewer`] without a renderer. Commands and queries are:
//! - Serializable (for recording, scripting, automation)
//! - Intent-based (select a node, not "set emissive to 0.6")
//! - Executed synchronously against one viewer
//!
//! # Example
//! ```ignore
//! use api::{execute_command, Command};
//!
//! let result = execute_command(&mut viewer, Command::SelectNode { id: NodeId(4) });
//! ```

mod command;
mod executor;
mod query;

pub use command::*;
pub use executor::{execute_command, execute_query};
pub use query::*;
