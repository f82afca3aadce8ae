//! GitHub access for release history, branches and release blockers.
//!
//! The [`traits::Forge`] seam keeps the API client swappable in tests, and
//! [`mirror::ForgeMirror`] caches what a single run has already fetched.

/// Connection and authentication settings.
pub mod config;

/// GitHub API client implementation.
pub mod github;

/// Per run cache of forge state.
pub mod mirror;

pub mod traits;

/// Shared data types for releases, branches, issues and pull requests.
pub mod types;
