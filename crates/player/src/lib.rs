//! GeoQuest Player crate.
//!
//! Application services for location-gated play, the ports they depend on,
//! and the desktop adapters that implement those ports.

pub mod app;
pub mod application;
pub mod console;
pub mod infrastructure;
pub mod ports;
