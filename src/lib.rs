//! spvpatch: switch a SPIR-V module to PhysicalStorageBuffer64 addressing
//! and resolve a debug line to the function that contains it.
//!
//! ```text
//! file -> words::read_words -> module::ParsedModule::parse
//!   -> patcher::Patcher::patch -> PatchOutcome::write -> file
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod instruction;
pub mod locator;
pub mod module;
pub mod patcher;
pub mod spirv;
pub mod test_utils;
pub mod words;

#[cfg(test)]
mod patcher_tests;

pub use config::PatchConfig;
pub use error::PatchError;
pub use module::ParsedModule;
pub use patcher::{PatchOutcome, Patcher};
