// src/hash/mod.rs

//! Content hashing of declared output files.
//!
//! - [`outputs`] hashes an ordered list of outputs with per-file failure
//!   isolation, either inline or on tokio's blocking pool.
//! - [`path_utils`] resolves declared paths against the working directory.

pub mod outputs;
pub mod path_utils;

pub use outputs::{hash_outputs, hash_outputs_blocking, hash_outputs_with, sha256_hex};
pub use path_utils::resolve_output_path;
