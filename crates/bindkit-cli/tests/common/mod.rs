//! Shared test utilities for bindkit-cli integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Manifest shared by the CLI tests.
pub const MANIFEST: &str = r#"
classes:
  - name: PostController
    kind: controller
    methods:
      - name: actionView
        parameters:
          - { name: id, type: int }
          - { name: page, type: int, default: 1 }
      - name: actionToggle
        parameters:
          - { name: active, type: bool }
      - name: actionEdit
        parameters:
          - { name: post, type: Post }
          - { name: mailer, type: Mailer }
      - name: actionSearch
        parameters:
          - { name: filter, type: PostFilter }
  - name: Post
    kind: active_record
    properties:
      - { name: id, type: int }
      - { name: title, type: string }
  - name: PostFilter
    kind: data_filter
    properties:
      - { name: title, type: string }
services:
  - Mailer
entities:
  Post:
    - { id: 5, title: Hello }
"#;

/// Get a Command for the bindkit binary.
///
/// # Panics
///
/// Panics if the bindkit binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn bindkit_cmd() -> Command {
    let mut cmd = Command::cargo_bin("bindkit").expect("bindkit binary should exist");
    cmd.env_remove("BINDKIT_MANIFEST")
        .env_remove("BINDKIT_CONFIG")
        .env_remove("BINDKIT_VERBOSE")
        .env("BINDKIT_COLOR", "never");
    cmd
}

/// Write `content` as `bindkit.yaml` in `dir` and return its path.
pub fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("bindkit.yaml");
    fs::write(&path, content).expect("write manifest");
    path
}
