//! Application layer: the progression engine's services and wire DTOs.
//!
//! Services depend on port traits, not concrete infrastructure.

pub mod dto;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
