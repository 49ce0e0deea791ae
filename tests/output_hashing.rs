// tests/output_hashing.rs

use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use proptest::prelude::*;
use tempfile::tempdir;

use localrun::fs::{FileSystem, RealFileSystem};
use localrun::hash::{hash_outputs, hash_outputs_blocking, hash_outputs_with, sha256_hex};
use localrun::types::{WorkingDirectory, HASH_ERROR};
use localrun_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn existing_and_missing_outputs_keep_their_slots() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::write(dir.path().join("out.txt"), "generated")?;
    let expected = sha256_hex("generated".as_bytes())?;

    let (digests, diags) = hash_outputs(
        &WorkingDirectory::new(dir.path()),
        &strings(&["out.txt", "missing.txt"]),
    );

    assert_eq!(digests, vec![expected.as_str(), HASH_ERROR]);
    assert_eq!(diags.errors().count(), 1);

    let err = diags.errors().next().unwrap();
    assert!(err.summary.starts_with("Failed to open output file"));
    assert_eq!(err.path.as_deref(), Some(dir.path().join("missing.txt").as_path()));
    Ok(())
}

#[test]
fn digests_are_lowercase_hex_and_deterministic() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::write(dir.path().join("a.bin"), [0u8, 1, 2, 255])?;
    let work_dir = WorkingDirectory::new(dir.path());
    let outputs = strings(&["a.bin"]);

    let (first, _) = hash_outputs(&work_dir, &outputs);
    let (second, _) = hash_outputs(&work_dir, &outputs);

    assert_eq!(first, second);
    assert_eq!(first[0].len(), 64);
    assert!(first[0].chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

    // Same content elsewhere hashes the same.
    fs::write(dir.path().join("copy.bin"), [0u8, 1, 2, 255])?;
    let (copy, _) = hash_outputs(&work_dir, &strings(&["copy.bin"]));
    assert_eq!(copy, first);
    Ok(())
}

#[test]
fn content_change_changes_digest() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let work_dir = WorkingDirectory::new(dir.path());
    let outputs = strings(&["out.txt"]);

    fs::write(dir.path().join("out.txt"), "v1")?;
    let (before, _) = hash_outputs(&work_dir, &outputs);
    fs::write(dir.path().join("out.txt"), "v2")?;
    let (after, _) = hash_outputs(&work_dir, &outputs);

    assert_ne!(before, after);
    Ok(())
}

#[test]
fn absolute_outputs_ignore_the_working_dir() -> TestResult {
    init_tracing();

    let files = tempdir()?;
    let elsewhere = tempdir()?;
    let abs = files.path().join("abs.txt");
    fs::write(&abs, "absolute")?;

    let (digests, diags) = hash_outputs(
        &WorkingDirectory::new(elsewhere.path()),
        &[abs.to_string_lossy().to_string()],
    );

    assert!(diags.is_empty());
    assert_eq!(digests, vec![sha256_hex("absolute".as_bytes())?]);
    Ok(())
}

#[test]
fn relative_paths_are_normalized() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::create_dir(dir.path().join("gen"))?;
    fs::write(dir.path().join("out.txt"), "x")?;

    let (digests, diags) = hash_outputs(
        &WorkingDirectory::new(dir.path()),
        &strings(&["./gen/../out.txt"]),
    );

    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
    assert_eq!(digests, vec![sha256_hex("x".as_bytes())?]);
    Ok(())
}

#[cfg(unix)]
#[test]
fn read_failure_mid_stream_is_isolated() {
    use localrun::fs::mock::MockFileSystem;

    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_failing_file("/work/partial.bin", b"some bytes");
    fs.add_file("/work/good.bin", b"good");

    let (digests, diags) = hash_outputs_with(
        &fs,
        &WorkingDirectory::new("/work"),
        &strings(&["partial.bin", "good.bin"]),
    );

    assert_eq!(digests[0], HASH_ERROR);
    assert_eq!(digests[1], sha256_hex(&b"good"[..]).unwrap());
    let err = diags.errors().next().unwrap();
    assert_eq!(err.summary, "Failed to hash output file /work/partial.bin");
    assert!(err.detail.contains("simulated read failure"));
    assert_eq!(fs.open_handles(), 0);
}

/// Real filesystem that remembers which thread opened each file.
#[derive(Debug, Default)]
struct ThreadTrackingFs {
    openers: Mutex<Vec<ThreadId>>,
}

impl FileSystem for ThreadTrackingFs {
    fn open_read(&self, path: &Path) -> anyhow::Result<Box<dyn Read + Send>> {
        self.openers.lock().unwrap().push(thread::current().id());
        RealFileSystem.open_read(path)
    }
}

#[tokio::test]
async fn blocking_hash_runs_off_the_runtime_thread() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    fs::write(dir.path().join("out.txt"), "generated")?;
    let tracking = Arc::new(ThreadTrackingFs::default());

    let (digests, diags) = hash_outputs_blocking(
        tracking.clone(),
        WorkingDirectory::new(dir.path()),
        strings(&["out.txt", "missing.txt"]),
    )
    .await;

    assert_eq!(
        digests,
        vec![sha256_hex("generated".as_bytes())?, HASH_ERROR.to_string()]
    );
    assert_eq!(diags.errors().count(), 1);

    let openers = tracking.openers.lock().unwrap();
    assert_eq!(openers.len(), 2);
    assert!(openers.iter().all(|id| *id != thread::current().id()));
    Ok(())
}

proptest! {
    #[test]
    fn digest_list_matches_input_length_and_order(
        present in proptest::collection::vec(any::<bool>(), 0..12)
    ) {
        let dir = tempdir().unwrap();
        let mut outputs = Vec::new();
        for (i, exists) in present.iter().enumerate() {
            let name = format!("f{i}.txt");
            if *exists {
                fs::write(dir.path().join(&name), format!("content {i}")).unwrap();
            }
            outputs.push(name);
        }

        let (digests, diags) = hash_outputs(&WorkingDirectory::new(dir.path()), &outputs);

        prop_assert_eq!(digests.len(), outputs.len());
        prop_assert_eq!(diags.errors().count(), present.iter().filter(|p| !**p).count());
        for (i, (exists, digest)) in present.iter().zip(&digests).enumerate() {
            if *exists {
                let expected = sha256_hex(format!("content {i}").as_bytes()).unwrap();
                prop_assert_eq!(digest, &expected);
            } else {
                prop_assert_eq!(digest.as_str(), HASH_ERROR);
            }
        }
    }
}
