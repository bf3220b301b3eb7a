//! Locked, all-or-nothing file replacement for the file-backed store
//!
//! A data file `<key>.json` is guarded by a sibling `<key>.json.lock`. The
//! lock is an advisory `flock` taken through fs2; writers wait for it up to a
//! timeout. New contents are staged in a temp file next to the target and
//! renamed over it, so readers see either the old snapshot or the new one.
//!
//! Two `td` processes still race on whole snapshots: the last writer wins.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// How long a writer waits for the lock unless configured otherwise
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive hold on a lock file, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Lock `path` (created if missing), polling until `timeout_ms` elapses.
    /// A timeout is reported as [`Error::LockFailed`].
    pub fn acquire(path: impl AsRef<Path>, timeout_ms: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file, path }),
                Err(err) if !is_contended(&err) => return Err(err.into()),
                Err(_) if Instant::now() >= deadline => return Err(Error::LockFailed(path)),
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Lock the sidecar that guards `target`
    pub fn guarding(target: &Path, timeout_ms: u64) -> Result<Self> {
        Self::acquire(lock_path_for(target), timeout_ms)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// `<target>.lock`, next to `target`
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(OsString::from).unwrap_or_default();
    name.push(".lock");
    target.with_file_name(name)
}

/// Replace `target` with `data` via temp file, fsync and rename. Takes no lock.
pub fn replace_contents(target: &Path, data: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|err| Error::Io(err.error))?;
    Ok(())
}

/// [`replace_contents`] while holding the sidecar lock of `target`
pub fn replace_contents_locked(target: &Path, data: &[u8], timeout_ms: u64) -> Result<()> {
    let _guard = FileLock::guarding(target, timeout_ms)?;
    replace_contents(target, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn sidecar_sits_next_to_target() {
        assert_eq!(
            lock_path_for(Path::new("/data/taskManager_tasks.json")),
            PathBuf::from("/data/taskManager_tasks.json.lock")
        );
        assert_eq!(lock_path_for(Path::new("tasks.json")), PathBuf::from("tasks.json.lock"));
    }

    #[test]
    fn second_holder_waits_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json.lock");

        let held = FileLock::acquire(&path, 0).unwrap();
        assert_eq!(held.path(), path.as_path());

        let started = Instant::now();
        let err = FileLock::acquire(&path, 60).unwrap_err();
        assert!(matches!(err, Error::LockFailed(ref locked) if *locked == path));
        assert!(started.elapsed() >= Duration::from_millis(60));

        drop(held);
        FileLock::acquire(&path, 0).unwrap();
    }

    #[test]
    fn replace_overwrites_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tasks.json");

        replace_contents(&target, b"[]").unwrap();
        replace_contents_locked(&target, br#"[{"id":"a"}]"#, 500).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), r#"[{"id":"a"}]"#);
        assert_eq!(file_names(dir.path()), ["tasks.json", "tasks.json.lock"]);
    }

    #[test]
    fn locked_replace_fails_while_sidecar_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tasks.json");
        replace_contents(&target, b"[1]").unwrap();

        let _held = FileLock::guarding(&target, 0).unwrap();
        let err = replace_contents_locked(&target, b"[2]", 30).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert_eq!(fs::read_to_string(&target).unwrap(), "[1]");
    }

    #[test]
    fn concurrent_writers_leave_one_whole_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("tasks.json");
        let writers = 8;
        let barrier = Arc::new(Barrier::new(writers));

        let payloads: Vec<String> = (0..writers)
            .map(|n| format!(r#"[{{"writer":{n},"pad":"{}"}}]"#, "x".repeat(256)))
            .collect();
        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                let barrier = Arc::clone(&barrier);
                let target = target.clone();
                thread::spawn(move || {
                    barrier.wait();
                    replace_contents_locked(&target, payload.as_bytes(), 2000).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let written = fs::read_to_string(&target).unwrap();
        assert!(payloads.contains(&written));
    }
}
