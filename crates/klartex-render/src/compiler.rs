//! # Compiler Orchestrator
//!
//! Runs the external typesetting compiler over one source text and returns
//! the artifact bytes.
//!
//! ## Workspace
//!
//! Every invocation gets its own [`TempDir`] holding `document.tex` and the
//! directory bindings the source needs (`cls`, `klartex-base.cls`,
//! `branding`). Bindings are symlinks, so large assets are never copied.
//! The directory, links included, is removed when the invocation returns on
//! any path; removal never follows the links.
//!
//! ## Passes
//!
//! The compiler runs [`CompilerConfig::passes`] times in sequence, each
//! under its own timeout. The first non-zero exit or timeout aborts the
//! run. Only a bounded tail of the output is kept for the diagnostic, with
//! the workspace path scrubbed. After the last pass the artifact must exist;
//! a clean exit without one is [`CompileError::NoArtifact`].

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;

use klartex_core::{Classify, ErrorKind};

use crate::config::CompilerConfig;

const SOURCE_FILE: &str = "document.tex";
const ARTIFACT_FILE: &str = "document.pdf";
const WORKDIR_PLACEHOLDER: &str = "<workdir>";

/// Failure of a compiler invocation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The ephemeral workspace could not be prepared.
    #[error("failed to prepare compiler workspace: {0}")]
    Workspace(#[source] std::io::Error),

    /// The compiler executable could not be started.
    #[error("failed to start compiler '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A pass exited unsuccessfully.
    #[error("compiler failed on pass {pass} (exit {}):\n{diagnostic_tail}", display_exit(*exit_code))]
    Failed {
        pass: u32,
        /// `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Trailing output of the failed pass.
        diagnostic_tail: String,
    },

    /// A pass exceeded its time budget and was killed.
    #[error("compiler timed out on pass {pass} after {}s", timeout.as_secs())]
    TimedOut { pass: u32, timeout: Duration },

    /// Every pass succeeded but no artifact was written.
    #[error("compiler did not produce a PDF")]
    NoArtifact,

    #[error("failed to read compiled artifact: {0}")]
    ReadArtifact(#[source] std::io::Error),
}

fn display_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

impl CompileError {
    /// Diagnostic tail of a failed pass.
    pub fn diagnostic_tail(&self) -> Option<&str> {
        match self {
            Self::Failed {
                diagnostic_tail, ..
            } => Some(diagnostic_tail),
            _ => None,
        }
    }
}

impl Classify for CompileError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Workspace(_) | Self::Spawn { .. } | Self::Failed { .. } | Self::TimedOut { .. } => {
                ErrorKind::CompilationFailed
            }
            Self::NoArtifact | Self::ReadArtifact(_) => ErrorKind::NoArtifactProduced,
        }
    }
}

/// A host path made visible inside the compiler workspace under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceBinding {
    pub name: String,
    pub target: PathBuf,
}

impl WorkspaceBinding {
    pub fn new(name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }

    /// The standard bindings: `cls` and the top-level class file from the
    /// support directory, plus `branding` when a branding directory exists.
    pub fn standard(support_dir: &Path, branding_dir: Option<&Path>) -> Vec<Self> {
        let mut bindings = vec![Self::new("cls", support_dir)];
        let class_file = support_dir.join("klartex-base.cls");
        if class_file.is_file() {
            bindings.push(Self::new("klartex-base.cls", class_file));
        }
        if let Some(dir) = branding_dir.filter(|d| d.is_dir()) {
            bindings.push(Self::new("branding", dir));
        }
        bindings
    }
}

#[cfg(unix)]
fn bind(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn bind(target: &Path, link: &Path) -> std::io::Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Keeps the last `limit` characters of the combined output, with the
/// workspace path replaced by a placeholder.
fn diagnostic_tail(stdout: &[u8], stderr: &[u8], workdir: &Path, limit: usize) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        combined.push_str(&String::from_utf8_lossy(stderr));
    }
    let workdir = workdir.display().to_string();
    if !workdir.is_empty() {
        combined = combined.replace(&workdir, WORKDIR_PLACEHOLDER);
    }
    let total = combined.chars().count();
    if total <= limit {
        return combined;
    }
    combined.chars().skip(total - limit).collect()
}

/// Drives the external compiler.
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `source` with `bindings` visible and `search_dir` on the
    /// compiler's input search path.
    pub async fn compile(
        &self,
        source: &str,
        bindings: &[WorkspaceBinding],
        search_dir: &Path,
    ) -> Result<Vec<u8>, CompileError> {
        let started_at = Instant::now();
        let workspace: TempDir = tempfile::Builder::new()
            .prefix("klartex-")
            .tempdir()
            .map_err(CompileError::Workspace)?;
        let workdir = workspace.path();

        tokio::fs::write(workdir.join(SOURCE_FILE), source)
            .await
            .map_err(CompileError::Workspace)?;
        for binding in bindings {
            bind(&binding.target, &workdir.join(&binding.name)).map_err(CompileError::Workspace)?;
        }

        let search_path = format!(".:{}:", search_dir.display());
        let passes = self.config.passes.max(1);
        for pass in 1..=passes {
            self.run_pass(pass, workdir, &search_path).await?;
        }

        let artifact = workdir.join(ARTIFACT_FILE);
        if !artifact.is_file() {
            tracing::warn!(
                op = "compiler::compile",
                result = "error",
                error_code = "no_artifact",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "compiler exited cleanly without producing a PDF"
            );
            return Err(CompileError::NoArtifact);
        }
        let bytes = tokio::fs::read(&artifact)
            .await
            .map_err(CompileError::ReadArtifact)?;

        tracing::info!(
            op = "compiler::compile",
            result = "ok",
            passes,
            pdf_bytes = bytes.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "document compiled"
        );
        Ok(bytes)
    }

    async fn run_pass(&self, pass: u32, workdir: &Path, search_path: &str) -> Result<(), CompileError> {
        let started_at = Instant::now();
        let child = Command::new(&self.config.program)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg(SOURCE_FILE)
            .current_dir(workdir)
            .env("TEXINPUTS", search_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::warn!(
                    op = "compiler::pass",
                    result = "error",
                    error_code = "spawn",
                    program = %self.config.program,
                    error = %source,
                    "failed to start compiler"
                );
                CompileError::Spawn {
                    program: self.config.program.clone(),
                    source,
                }
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(CompileError::Workspace)?,
            Err(_) => {
                tracing::warn!(
                    op = "compiler::pass",
                    result = "error",
                    error_code = "timeout",
                    pass,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    "compiler pass timed out"
                );
                return Err(CompileError::TimedOut {
                    pass,
                    timeout: self.config.timeout,
                });
            }
        };

        if !output.status.success() {
            let exit_code = output.status.code();
            tracing::warn!(
                op = "compiler::pass",
                result = "error",
                error_code = "compiler_failed",
                pass,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "compiler pass failed"
            );
            return Err(CompileError::Failed {
                pass,
                exit_code,
                diagnostic_tail: diagnostic_tail(
                    &output.stdout,
                    &output.stderr,
                    workdir,
                    self.config.diagnostic_tail,
                ),
            });
        }

        tracing::debug!(
            op = "compiler::pass",
            result = "ok",
            pass,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "compiler pass finished"
        );
        Ok(())
    }
}


#[cfg(all(test, unix))]
mod process_tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        support: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().expect("temp dir");
            let support = dir.path().join("cls");
            fs::create_dir(&support).expect("support dir");
            fs::write(support.join("klartex-base.cls"), "% class").expect("class file");
            Self { dir, support }
        }

        fn fake_compiler(&self, body: &str) -> Compiler {
            let script_path = self.dir.path().join("fake-xelatex");
            fs::write(&script_path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            let mut perms = fs::metadata(&script_path).expect("metadata").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms).expect("set perms");
            Compiler::new(CompilerConfig {
                program: script_path.display().to_string(),
                timeout: Duration::from_secs(10),
                ..CompilerConfig::default()
            })
        }

        fn log(&self) -> PathBuf {
            self.dir.path().join("passes.log")
        }

        fn pass_count(&self) -> usize {
            fs::read_to_string(self.log())
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }

        async fn compile(&self, compiler: &Compiler) -> Result<Vec<u8>, CompileError> {
            let bindings = WorkspaceBinding::standard(&self.support, None);
            compiler.compile("\\documentclass{klartex-base}", &bindings, &self.support).await
        }
    }

    #[tokio::test]
    async fn compiles_in_two_passes() {
        let fixture = Fixture::new();
        let compiler = fixture.fake_compiler(&format!(
            r#"set -eu
echo "$@" >> "{log}"
test -f document.tex
test -f cls/klartex-base.cls
test -f klartex-base.cls
case "$TEXINPUTS" in
  .:*:) ;;
  *) echo "bad TEXINPUTS: $TEXINPUTS"; exit 4 ;;
esac
echo fake-pdf > document.pdf"#,
            log = fixture.log().display()
        ));

        let bytes = fixture.compile(&compiler).await.expect("compiled");
        assert_eq!(bytes, b"fake-pdf\n");
        assert_eq!(fixture.pass_count(), 2);
        let args = fs::read_to_string(fixture.log()).expect("log");
        assert!(args.contains("-interaction=nonstopmode -halt-on-error document.tex"));
    }

    #[tokio::test]
    async fn first_pass_failure_aborts() {
        let fixture = Fixture::new();
        let compiler = fixture.fake_compiler(&format!(
            r#"echo run >> "{log}"
echo "! Undefined control sequence in $PWD/document.tex"
exit 1"#,
            log = fixture.log().display()
        ));

        let err = fixture.compile(&compiler).await.expect_err("expected failure");
        match &err {
            CompileError::Failed {
                pass,
                exit_code,
                diagnostic_tail,
            } => {
                assert_eq!(*pass, 1);
                assert_eq!(*exit_code, Some(1));
                assert!(diagnostic_tail.contains("Undefined control sequence"));
                assert!(diagnostic_tail.contains("<workdir>/document.tex"));
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
        assert_eq!(fixture.pass_count(), 1);
    }

    #[tokio::test]
    async fn second_pass_failure_reported() {
        let fixture = Fixture::new();
        let compiler = fixture.fake_compiler(&format!(
            r#"echo run >> "{log}"
if [ -f document.aux ]; then echo "! Emergency stop."; exit 3; fi
touch document.aux"#,
            log = fixture.log().display()
        ));

        let err = fixture.compile(&compiler).await.expect_err("expected failure");
        assert!(matches!(err, CompileError::Failed { pass: 2, exit_code: Some(3), .. }));
        assert_eq!(fixture.pass_count(), 2);
    }

    #[tokio::test]
    async fn clean_exit_without_pdf() {
        let fixture = Fixture::new();
        let compiler = fixture.fake_compiler("exit 0");
        let err = fixture.compile(&compiler).await.expect_err("expected failure");
        assert!(matches!(err, CompileError::NoArtifact));
        assert_eq!(err.kind(), ErrorKind::NoArtifactProduced);
    }

    #[tokio::test]
    async fn hung_compiler_times_out() {
        let fixture = Fixture::new();
        let mut compiler = fixture.fake_compiler("sleep 30");
        compiler.config.timeout = Duration::from_millis(200);

        let started = Instant::now();
        let err = fixture.compile(&compiler).await.expect_err("expected timeout");
        assert!(matches!(err, CompileError::TimedOut { pass: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_program() {
        let fixture = Fixture::new();
        let compiler = Compiler::new(CompilerConfig {
            program: fixture.dir.path().join("no-such-tex").display().to_string(),
            ..CompilerConfig::default()
        });
        let err = fixture.compile(&compiler).await.expect_err("expected spawn failure");
        assert!(matches!(err, CompileError::Spawn { .. }));
        assert_eq!(err.kind(), ErrorKind::CompilationFailed);
    }

    #[tokio::test]
    async fn workspace_removed_after_run() {
        let fixture = Fixture::new();
        let record = fixture.dir.path().join("workdir.txt");
        let compiler = fixture.fake_compiler(&format!(
            r#"pwd > "{record}"
echo pdf > document.pdf"#,
            record = record.display()
        ));

        fixture.compile(&compiler).await.expect("compiled");
        let workdir = fs::read_to_string(&record).expect("record");
        assert!(!Path::new(workdir.trim()).exists());
        assert!(fixture.support.join("klartex-base.cls").exists());
    }
}
