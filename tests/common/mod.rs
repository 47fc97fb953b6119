#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

pub const USERS_DICTIONARY: &str = r#"tables:
  users:
    new: app_users
    description: registered users
columns:
  users:
    uid:
      new: user_id
      description: user id
"#;

/// Scratch directory laid out like a conversion project: `dictionary/`, `in/`, `out/`.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let workspace = Self {
            temp_dir: tempdir().expect("temp dir"),
        };
        fs::create_dir_all(workspace.input_dir()).expect("create input dir");
        workspace
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn input_dir(&self) -> PathBuf {
        self.path().join("in")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.path().join("dictionary").join("rename_dictionary.yaml")
    }

    /// Writes the rename dictionary and returns its path.
    pub fn write_dictionary(&self, contents: &str) -> PathBuf {
        let path = self.dictionary_path();
        fs::create_dir_all(path.parent().expect("parent")).expect("create dictionary dir");
        fs::write(&path, contents).expect("write dictionary");
        path
    }

    /// Writes a schema document under `in/` and returns its path.
    pub fn write_input(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.input_dir().join(name);
        fs::write(&path, contents).expect("write input document");
        path
    }

    pub fn read_output(&self, name: &str) -> String {
        fs::read_to_string(self.output_dir().join(name)).expect("read output file")
    }

    /// Names of files directly under `dir`, sorted.
    pub fn list(&self, dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }
}

pub fn users_document() -> &'static str {
    r#"metadata:
  description: table definition
  author: data team
  history:
    - version: 1.0.0
      date: '2025-09-12'
      author: data team
      comment: initial
table_name: users
description: registered users
columns:
  - name: uid
    description: user id
    data_type: BIGINT
    primary_key: true
    nullable: false
  - name: id
    description: surrogate key
    data_type: BIGINT
    primary_key: false
    nullable: false
"#
}
