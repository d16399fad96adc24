//! Gatekeeper command-line interface
//!
//! The `gatekeeper` binary exposes two entry points:
//!
//! - `call`: the process boundary. Reads one JSON request, writes one JSON response.
//! - `scan`: a human-facing wrapper around the same pipeline.

pub mod boundary;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
