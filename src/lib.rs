// SPDX-License-Identifier: CC0-1.0

//! rpct umbrella crate.
//!
//! This crate primarily serves as the workspace root.
//!
//! All functional code lives in the workspace member crates: the
//! generic type system in `primitives/` (`rpct-ir`, `rpct-registry`,
//! `rpct-classes`, `rpct-path`), and the IDL compiler built on top of it
//! in `compiler/` (`rpct-reader`, `rpct-validate`, `rpct-codec`,
//! `rpct-engine`, `rpct-config`, `rpct-logging`), fronted by the
//! `rpct-cli` binary under `cli/`.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(deprecated_in_future)]
#![doc(test(attr(warn(unused))))]

/// Miscellaneous metadata about the rpct workspace.
pub mod rpct_meta {
    /// Version string for the umbrella crate, as reported by Cargo.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
