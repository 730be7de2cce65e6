//! Shared helpers for `jw` integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jour_common::lock::{LockSpec, DEFAULT_LOCK_NAME};

pub const JOURNAL: &str = "journal.md";
pub const EMERGENCY: &str = "journal_emergency.md";

pub struct Tmp {
    pub dir: tempfile::TempDir,
}

impl Tmp {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.path().join(rel)
    }

    pub fn write(&self, rel: &str, data: &str) {
        let p = self.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(p, data).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.join(rel)).unwrap()
    }

    pub fn lines(&self, rel: &str) -> Vec<String> {
        self.read(rel).lines().map(str::to_string).collect()
    }

    /// The lock `jw` takes when run through [`Tmp::jw`].
    pub fn lock_spec(&self) -> LockSpec {
        LockSpec {
            name: DEFAULT_LOCK_NAME.to_string(),
            dir: self.join("locks"),
            timeout: Duration::from_secs(1),
        }
    }

    /// `jw` isolated from the caller's environment: journals, lock and home
    /// all live in the temp dir.
    pub fn jw(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("jw").unwrap();
        cmd.current_dir(self.path())
            .env_remove("JOUR_CONFIG")
            .env_remove("JOUR_SIGNATURE")
            .env_remove("JOUR_LOCK_TIMEOUT_SECS")
            .env_remove("RUST_LOG")
            .env("HOME", self.path())
            .env("USER", "test_user")
            .env("JOURNAL", self.join(JOURNAL))
            .env("JOURNAL_EMERGENCY", self.join(EMERGENCY))
            .env("JOUR_LOCK_DIR", self.join("locks"))
            .timeout(Duration::from_secs(20));
        cmd
    }
}
