//! Filesystem layout of the shuffle.
//!
//! Intermediate and output names are deterministic and worker-agnostic:
//! map task `m` always publishes partition `r` as `mr-{m}-{r}`, no matter
//! which worker ran it, so a reducer can locate every bucket knowing only
//! the number of map tasks. Every file is first written to a `-tmp`
//! sibling and renamed into place; the rename is the publish point, which
//! makes duplicate executions of a task idempotent at the filesystem
//! level.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;

/// How many times a reducer re-polls a missing intermediate file before
/// giving the task up.
const MISSING_FILE_RETRIES: u32 = 5;
const MISSING_FILE_DELAY: Duration = Duration::from_millis(200);

/// Bucket `reduce_id` of map task `map_id`.
pub fn intermediate_name(map_id: u32, reduce_id: u32) -> String {
    format!("mr-{map_id}-{reduce_id}")
}

/// Final output of reduce partition `reduce_id`.
pub fn output_name(reduce_id: u32) -> String {
    format!("mr-out-{reduce_id}")
}

/// Temp sibling a file is staged under before the publishing rename.
pub fn temp_name(name: &str) -> String {
    format!("{name}-tmp")
}

/// Atomically publish `contents` as `dir/name`.
pub fn publish(dir: &Path, name: &str, contents: &[u8]) -> Result<()> {
    let staged = dir.join(temp_name(name));
    {
        // a scope so the file is closed before the rename
        let mut file = File::create(&staged)
            .with_context(|| format!("creating {}", staged.display()))?;
        file.write_all(contents)
            .with_context(|| format!("writing {}", staged.display()))?;
    }
    fs::rename(&staged, dir.join(name)).with_context(|| format!("publishing {name}"))?;
    Ok(())
}

/// Read one intermediate bucket file, tolerating the short window where it
/// does not exist: its map task may have finished on a worker whose rename
/// has not landed yet, or a duplicate run may just have replaced it.
pub fn read_intermediate(dir: &Path, map_id: u32, reduce_id: u32) -> Result<Vec<u8>> {
    let path = dir.join(intermediate_name(map_id, reduce_id));
    let mut attempts = 0;
    loop {
        match fs::read(&path) {
            Ok(contents) => return Ok(contents),
            Err(err) if err.kind() == ErrorKind::NotFound && attempts < MISSING_FILE_RETRIES => {
                attempts += 1;
                warn!(
                    "intermediate file {} missing, retry {attempts}/{MISSING_FILE_RETRIES}",
                    path.display()
                );
                thread::sleep(MISSING_FILE_DELAY);
            }
            Err(err) => return Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(intermediate_name(3, 7), "mr-3-7");
        assert_eq!(output_name(2), "mr-out-2");
        assert_eq!(temp_name("mr-out-2"), "mr-out-2-tmp");
    }

    #[test]
    fn publish_leaves_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        publish(dir.path(), "mr-0-0", b"contents").unwrap();
        assert_eq!(fs::read(dir.path().join("mr-0-0")).unwrap(), b"contents");
        assert!(!dir.path().join("mr-0-0-tmp").exists());
    }

    #[test]
    fn publish_replaces_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        publish(dir.path(), "mr-1-0", b"first run").unwrap();
        publish(dir.path(), "mr-1-0", b"duplicate run").unwrap();
        assert_eq!(
            fs::read(dir.path().join("mr-1-0")).unwrap(),
            b"duplicate run"
        );
    }

    #[test]
    fn missing_intermediate_fails_after_bounded_retries() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_intermediate(dir.path(), 9, 9).is_err());
    }
}
