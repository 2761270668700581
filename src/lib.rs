//! `lazymaint` keeps a Kodi installation tidy: it clears caches, backs up and
//! restores user data as a zip archive, manages `kodi.log`, and can reset Kodi
//! to a fresh state.
//!
//! The binary in `src/bin/lazymaint.rs` is a thin wrapper over [`cli`]; the
//! actual work lives in [`core`], with shared helpers in [`utils`].

pub mod logger;

pub mod cli;
pub mod core;
pub mod utils;
