//! Integration test harness: spawns the built `stagecraft` binary inside a
//! throwaway project directory — a temp dir plus a `write_file` helper
//! plus a preconfigured `Command`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::TempDir;

mod errors;
mod keys_and_sections;
mod resolve;

pub struct CliTest {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl CliTest {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().canonicalize()?;
        Ok(Self { _temp_dir: temp_dir, project_dir })
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        fs::write(&file_path, content)
            .with_context(|| format!("failed to write file: {}", file_path.display()))?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.project_dir
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stagecraft"));
        cmd.current_dir(&self.project_dir);
        cmd.env_clear();
        cmd.env("NO_COLOR", "1");
        cmd
    }
}

/// Runs `stagecraft <args>` and returns `(stdout, stderr, success)`.
pub fn run(test: &CliTest, args: &[&str]) -> Result<(String, String, bool)> {
    let output = test.command().args(args).output()?;
    Ok((
        String::from_utf8(output.stdout)?,
        String::from_utf8(output.stderr)?,
        output.status.success(),
    ))
}

pub fn run_json(test: &CliTest, args: &[&str]) -> Result<serde_json::Value> {
    let (stdout, stderr, success) = run(test, args)?;
    anyhow::ensure!(success, "stagecraft {:?} failed: {}", args, stderr);
    Ok(serde_json::from_str(&stdout)?)
}
