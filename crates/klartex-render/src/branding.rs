//! # Branding
//!
//! Organisation identity applied to every rendered document: name, contact
//! lines, logo, colours and font. Profiles live as `<name>.yaml` in the
//! branding directory; the directory itself is also bound into the compiler
//! workspace so logos and fonts resolve.
//!
//! The profile named [`DEFAULT_BRANDING`] always exists: when its file is
//! absent the built-in defaults are used.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use klartex_core::{escape_value, Classify, ErrorKind, DEFAULT_LANG};

/// Name of the profile that falls back to built-in defaults.
pub const DEFAULT_BRANDING: &str = "default";

/// Error loading a branding profile.
#[derive(Error, Debug)]
pub enum BrandingError {
    /// No `<name>.yaml` exists and `name` is not the default profile.
    #[error("Branding '{name}' not found")]
    NotFound { name: String },

    /// The name would escape the branding directory.
    #[error("invalid branding name '{name}'")]
    InvalidName { name: String },

    /// The profile file exists but cannot be read or parsed.
    #[error("failed to load branding '{name}' from {}: {reason}", path.display())]
    Load {
        name: String,
        path: PathBuf,
        reason: String,
    },
}

impl Classify for BrandingError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::InvalidName { .. } => ErrorKind::UnknownBranding,
            Self::Load { .. } => ErrorKind::Configuration,
        }
    }
}

/// Postal address lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub line1: String,
    pub line2: String,
}

/// Colour palette as hex triplets without the leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            primary: "1A1A1A".to_string(),
            secondary: "666666".to_string(),
            accent: "0066CC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Font {
    /// Main font family. Empty keeps the document class default.
    pub family: String,
}

/// A branding profile. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub name: String,
    pub org_number: String,
    pub address: Address,
    pub website: String,
    pub email: String,
    pub phone: String,
    /// Logo file name inside the branding directory, e.g. `logo.pdf`.
    pub logo: String,
    pub colors: Colors,
    pub font: Font,
    pub lang: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            name: String::new(),
            org_number: String::new(),
            address: Address::default(),
            website: String::new(),
            email: String::new(),
            phone: String::new(),
            logo: String::new(),
            colors: Colors::default(),
            font: Font::default(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl Branding {
    /// Load profile `name` from `branding_dir`.
    ///
    /// # Errors
    ///
    /// - [`BrandingError::NotFound`] when the file is absent and `name` is
    ///   not [`DEFAULT_BRANDING`].
    /// - [`BrandingError::InvalidName`] for names containing path separators.
    /// - [`BrandingError::Load`] when the file is unreadable or malformed.
    pub fn load(name: &str, branding_dir: &Path) -> Result<Self, BrandingError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(BrandingError::InvalidName {
                name: name.to_string(),
            });
        }

        let path = branding_dir.join(format!("{name}.yaml"));
        if !path.is_file() {
            if name == DEFAULT_BRANDING {
                tracing::debug!(dir = %branding_dir.display(), "using built-in default branding");
                return Ok(Self::default());
            }
            return Err(BrandingError::NotFound {
                name: name.to_string(),
            });
        }

        let load_err = |reason: String| BrandingError::Load {
            name: name.to_string(),
            path: path.clone(),
            reason,
        };
        let text = std::fs::read_to_string(&path).map_err(|e| load_err(e.to_string()))?;
        let branding: Self = serde_yaml::from_str(&text).map_err(|e| load_err(e.to_string()))?;
        tracing::debug!(branding = name, path = %path.display(), "loaded branding");
        Ok(branding)
    }

    /// The escaped value handed to the expansion templates as `brand`.
    ///
    /// `logo` is a file reference for the compiler and stays verbatim.
    pub fn to_context(&self) -> Value {
        let raw = match serde_json::to_value(self) {
            Ok(value) => value,
            Err(_) => return Value::Null,
        };
        let mut escaped = escape_value(&raw);
        if let Some(map) = escaped.as_object_mut() {
            map.insert("logo".to_string(), Value::String(self.logo.clone()));
        }
        escaped
    }
}
