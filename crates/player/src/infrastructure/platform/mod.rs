//! Storage providers.
//!
//! `desktop` persists to a JSON file; `memory` keeps everything in process
//! and backs tests and dry runs.

mod desktop;
mod memory;

pub use desktop::{default_storage_path, FileStorageProvider};
pub use memory::MemoryStorageProvider;
