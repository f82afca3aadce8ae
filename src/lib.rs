pub mod blocker;
pub mod cadence;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod forge;
pub mod git;
pub mod notes;
pub mod pipeline;
pub mod selector;
pub mod state;
pub mod verify;
pub mod version;

pub use error::{ReleaseError, Result};

#[cfg(test)]
pub mod test_helpers;
