//! pcc: a printable-character counting client/server.
//!
//! A client sends a file over TCP as a 4-byte big-endian length followed by
//! the raw contents; the server reads exactly that many bytes in bounded
//! chunks, counts how many fall in the printable ASCII range [32,126], and
//! returns the count as another 4-byte big-endian integer. Across sessions
//! the server accumulates a per-character frequency histogram and prints it
//! when asked to shut down.
//!
//! The wire protocol and the serving logic live in this library so the
//! `pcc-server` and `pcc-client` binaries (and the tests) share them.

pub mod client;
pub mod config;
pub mod frame;
pub mod handler;
pub mod reader;
pub mod scanner;
pub mod server;
