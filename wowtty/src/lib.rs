//! Console chat client core.
//!
//! The binary in `main.rs` wires these pieces to the SDK engine: `options`
//! resolves the CLI surface, `commands` turns input lines into protocol
//! requests, `session` orchestrates engine events, and `output` routes
//! formatted text to the console or redirect destinations.

pub mod commands;
pub mod options;
pub mod output;
pub mod session;
