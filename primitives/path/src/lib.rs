#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Filesystem helpers for the typing core's schema loader: workspace-root
//! discovery and recursive `.yaml` directory walking.

pub mod path_utils;

pub use path_utils::{find_project_root, walk_yaml_files};
