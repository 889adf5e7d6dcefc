//! # Render Configuration
//!
//! Where the pipeline finds its assets and how it drives the external
//! compiler.
//!
//! ## Asset root
//!
//! `templates/`, `cls/` and `branding/` live under one asset root, chosen
//! in this order:
//!
//! 1. `KLARTEX_HOME`, when set (see [`RenderConfig::from_env`]);
//! 2. an installation around the running executable: its own directory, or
//!    `<prefix>/share/klartex` for an executable in `<prefix>/bin`;
//! 3. the source checkout the crate was built from.
//!
//! Individual directories can still be relocated one by one:
//!
//! | Variable                       | Field                     |
//! |--------------------------------|---------------------------|
//! | `KLARTEX_HOME`                 | asset root                |
//! | `KLARTEX_TEMPLATES_DIR`        | `templates_dir`           |
//! | `KLARTEX_CLS_DIR`              | `support_dir`             |
//! | `KLARTEX_BRANDING_DIR`         | `branding_dir`            |
//! | `KLARTEX_COMPILER`             | `compiler.program`        |
//! | `KLARTEX_COMPILE_TIMEOUT_SECS` | `compiler.timeout`        |

use std::path::{Path, PathBuf};
use std::time::Duration;

use klartex_core::{Classify, ErrorKind};
use thiserror::Error;

/// Default number of compiler passes. The second pass resolves the
/// cross-references written by the first.
pub const DEFAULT_PASSES: u32 = 2;

/// Default wall-clock budget of a single compiler pass.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of trailing diagnostic characters kept on failure.
pub const DEFAULT_DIAGNOSTIC_TAIL: usize = 2000;

/// Error reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// How the external compiler is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Executable name or path.
    pub program: String,
    /// Number of sequential passes, at least one.
    pub passes: u32,
    /// Per-pass timeout.
    pub timeout: Duration,
    /// Characters of trailing output kept in a failure diagnostic.
    pub diagnostic_tail: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "xelatex".to_string(),
            passes: DEFAULT_PASSES,
            timeout: DEFAULT_TIMEOUT,
            diagnostic_tail: DEFAULT_DIAGNOSTIC_TAIL,
        }
    }
}

/// Asset locations and compiler settings for a [`RenderPipeline`](crate::RenderPipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Base templates and one sub-directory per named template.
    pub templates_dir: PathBuf,
    /// Shared document class and support packages.
    pub support_dir: PathBuf,
    /// Branding YAML files and their assets.
    pub branding_dir: PathBuf,
    pub compiler: CompilerConfig,
}

const TEMPLATES: &str = "templates";

fn checkout_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Asset root of an installation laid out around `exe`, if any.
fn installed_root(exe: &Path) -> Option<PathBuf> {
    let bin_dir = exe.parent()?;
    let candidates = [
        bin_dir.to_path_buf(),
        bin_dir.join("..").join("share").join("klartex"),
    ];
    candidates
        .into_iter()
        .find(|root| root.join(TEMPLATES).is_dir())
}

fn default_root() -> PathBuf {
    match std::env::current_exe().ok().and_then(|exe| installed_root(&exe)) {
        Some(root) => root,
        None => {
            let root = checkout_root();
            tracing::debug!(root = %root.display(), "no installed assets, using source checkout");
            root
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::with_root(&default_root())
    }
}

impl RenderConfig {
    /// Default settings with every asset directory under `root`.
    pub fn with_root(root: &Path) -> Self {
        Self {
            templates_dir: root.join(TEMPLATES),
            support_dir: root.join("cls"),
            branding_dir: root.join("branding"),
            compiler: CompilerConfig::default(),
        }
    }

    /// Defaults overridden by `KLARTEX_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when the timeout is not a
    /// positive whole number of seconds.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("KLARTEX_HOME") {
            Some(home) => Self::with_root(Path::new(&home)),
            None => Self::default(),
        };
        if let Some(dir) = lookup("KLARTEX_TEMPLATES_DIR") {
            config.templates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("KLARTEX_CLS_DIR") {
            config.support_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("KLARTEX_BRANDING_DIR") {
            config.branding_dir = PathBuf::from(dir);
        }
        if let Some(program) = lookup("KLARTEX_COMPILER") {
            config.compiler.program = program;
        }
        if let Some(raw) = lookup("KLARTEX_COMPILE_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    var: "KLARTEX_COMPILE_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    var: "KLARTEX_COMPILE_TIMEOUT_SECS",
                    value: raw,
                    reason: "timeout must be at least one second".to_string(),
                });
            }
            config.compiler.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}
