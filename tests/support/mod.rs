#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Isolated data and config directories for one CLI test
pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        fs::create_dir_all(dir.path().join("data")).expect("data dir");
        fs::create_dir_all(dir.path().join("home")).expect("home dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn write_data(&self, key: &str, contents: &str) -> PathBuf {
        let path = self.data_dir().join(format!("{key}.json"));
        fs::write(&path, contents).expect("write data file");
        path
    }

    pub fn read_data(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.data_dir().join(format!("{key}.json"))).ok()
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("config.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    /// `td` with `--data-dir` pointed at this deck and no ambient config
    pub fn td(&self) -> Command {
        let mut cmd = td_cmd(&self.dir.path().join("home"));
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd
    }

    /// Run `td <args> --json` and return the parsed envelope
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .td()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Add a task and return its id
    pub fn add(&self, title: &str) -> String {
        let value = self.json(&["add", title]);
        value["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}

/// `td` with HOME and XDG dirs redirected so no user config leaks in
pub fn td_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("td").expect("binary");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"))
        .env_remove("TASKDECK_DATA_DIR")
        .env_remove("TASKDECK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}
