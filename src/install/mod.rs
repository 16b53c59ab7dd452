//! Installation module
//!
//! This module provides functionality for:
//! - Fetching the manager's release metadata from GitHub
//! - Driving the bootstrap state machine (install, trust, init/add, verify)

pub mod bootstrap;
pub mod github;

pub use bootstrap::{BootstrapPlan, Bootstrapper, Collaborators};
pub use github::{build_latest_release_url, GitHubReleaseClient, ReleaseClient};
