// src/hash/outputs.rs

use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::fs::{FileSystem, RealFileSystem};
use crate::hash::path_utils::resolve_output_path;
use crate::types::{WorkingDirectory, HASH_ERROR};

/// Stream `reader` through SHA-256 and return the lowercase hex digest.
pub fn sha256_hex(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash every declared output on the real filesystem.
///
/// See [`hash_outputs_with`].
pub fn hash_outputs(work_dir: &WorkingDirectory, outputs: &[String]) -> (Vec<String>, Diagnostics) {
    hash_outputs_with(&RealFileSystem, work_dir, outputs)
}

/// Hash every declared output, in order.
///
/// The returned digest list always has one entry per input path. A file that
/// cannot be resolved, opened or read gets [`HASH_ERROR`] in its slot plus an
/// error diagnostic attached to its path; the remaining files are still
/// hashed.
pub fn hash_outputs_with(
    fs: &dyn FileSystem,
    work_dir: &WorkingDirectory,
    outputs: &[String],
) -> (Vec<String>, Diagnostics) {
    let mut digests = Vec::with_capacity(outputs.len());
    let mut diagnostics = Diagnostics::new();

    for output in outputs {
        let digest = hash_output(fs, work_dir, output, &mut diagnostics)
            .unwrap_or_else(|| HASH_ERROR.to_string());
        digests.push(digest);
    }

    debug!(
        outputs = outputs.len(),
        failed = diagnostics.errors().count(),
        "hashed declared outputs"
    );
    (digests, diagnostics)
}

/// Hash every declared output on tokio's blocking pool.
///
/// Same result as [`hash_outputs_with`]. If the blocking task itself dies,
/// every slot gets [`HASH_ERROR`] and one error diagnostic is reported.
pub async fn hash_outputs_blocking(
    fs: Arc<dyn FileSystem>,
    work_dir: WorkingDirectory,
    outputs: Vec<String>,
) -> (Vec<String>, Diagnostics) {
    let count = outputs.len();
    let task =
        tokio::task::spawn_blocking(move || hash_outputs_with(fs.as_ref(), &work_dir, &outputs));

    match task.await {
        Ok(result) => result,
        Err(err) => {
            warn!(error = %err, "output hashing task failed");
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_error("Failed to hash outputs", err.to_string());
            (vec![HASH_ERROR.to_string(); count], diagnostics)
        }
    }
}

fn hash_output(
    fs: &dyn FileSystem,
    work_dir: &WorkingDirectory,
    output: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let path = match resolve_output_path(work_dir.as_path(), Path::new(output)) {
        Ok(path) => path,
        Err(err) => {
            warn!(output = %output, error = %err, "failed to resolve output path");
            diagnostics.add_path_error(
                format!("Failed to resolve output path {output}"),
                Path::new(output),
                err.to_string(),
            );
            return None;
        }
    };

    // Dropped at the end of this function on every path.
    let reader = match fs.open_read(&path) {
        Ok(reader) => reader,
        Err(err) => {
            warn!(path = ?path, error = %err, "failed to open output file");
            diagnostics.add_path_error(
                format!("Failed to open output file {}", path.display()),
                &path,
                format!("{err:#}"),
            );
            return None;
        }
    };

    match sha256_hex(reader) {
        Ok(digest) => {
            debug!(path = ?path, digest = %digest, "hashed output file");
            Some(digest)
        }
        Err(err) => {
            warn!(path = ?path, error = %err, "failed to hash output file");
            diagnostics.add_path_error(
                format!("Failed to hash output file {}", path.display()),
                &path,
                err.to_string(),
            );
            None
        }
    }
}
