//! Optimus-OS control daemon library.
//!
//! Exposes the modules needed to build the router and drive the
//! scheduler loop; `main.rs` wires them together.

pub mod api;
pub mod config;
pub mod events;
pub mod supervisor;
pub mod tracing_layer;
