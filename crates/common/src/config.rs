//! # Jour Configuration
//!
//! Resolves the journal paths, the default signature and the lock settings.
//!
//! ## Configuration Loading
//!
//! Sources in order of precedence:
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`JOURNAL`, `JOURNAL_EMERGENCY`, `JOUR_*`)
//! 3. Configuration file (`--config`, `$JOUR_CONFIG`, `~/.config/jour/config.toml`)
//! 4. Built-in defaults derived from the home directory and the host name
//!
//! This is the only module that reads the process environment; everything
//! downstream receives explicit values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::errors::{JourError, JourResult};
use crate::lock::{LockSpec, DEFAULT_LOCK_NAME, DEFAULT_LOCK_TIMEOUT};
use crate::paths::PathResolver;
use crate::session::SessionOptions;

pub const ENV_JOURNAL: &str = "JOURNAL";
pub const ENV_JOURNAL_EMERGENCY: &str = "JOURNAL_EMERGENCY";
pub const ENV_SIGNATURE: &str = "JOUR_SIGNATURE";
pub const ENV_USER: &str = "USER";
pub const ENV_CONFIG: &str = "JOUR_CONFIG";
pub const ENV_LOCK_DIR: &str = "JOUR_LOCK_DIR";
pub const ENV_LOCK_TIMEOUT_SECS: &str = "JOUR_LOCK_TIMEOUT_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourConfig {
    /// Primary journal file
    pub journal: Option<PathBuf>,

    /// Fallback used when the primary journal is unreachable
    pub emergency_journal: Option<PathBuf>,

    /// User-chosen journal; never falls back to the emergency journal
    #[serde(skip)]
    pub custom_journal: Option<PathBuf>,

    /// Signature written on new entries
    pub signature: Option<String>,

    /// Create the primary journal when missing instead of falling back
    pub create_journal: bool,

    /// Keep a `.bup` copy of the journal while a session is open
    pub backup: bool,

    /// Cross-process lock settings
    pub lock: LockConfig,
}

impl Default for JourConfig {
    fn default() -> Self {
        Self {
            journal: None,
            emergency_journal: None,
            custom_journal: None,
            signature: None,
            create_journal: false,
            backup: true,
            lock: LockConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    pub name: String,
    pub dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_LOCK_NAME.to_string(),
            dir: None,
            timeout_secs: DEFAULT_LOCK_TIMEOUT.as_secs(),
        }
    }
}

impl JourConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> JourResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            JourError::config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            JourError::config(format!("failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Loads the file layer (explicit path, `$JOUR_CONFIG`, or the default
    /// location when present) and applies environment overrides.
    pub fn load(explicit: Option<&Path>) -> JourResult<Self> {
        let file = explicit
            .map(Path::to_path_buf)
            .or_else(|| env_var(ENV_CONFIG).map(PathBuf::from))
            .or_else(|| {
                home_dir()
                    .map(|home| home.join(".config").join("jour").join("config.toml"))
                    .filter(|p| p.is_file())
            });

        let mut config = match file {
            Some(path) => {
                tracing::debug!("loading config from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(env_var);
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_JOURNAL) {
            self.journal = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup(ENV_JOURNAL_EMERGENCY) {
            self.emergency_journal = Some(PathBuf::from(path));
        }
        if let Some(signature) = lookup(ENV_SIGNATURE) {
            self.signature = Some(signature);
        } else if self.signature.is_none() {
            self.signature = lookup(ENV_USER);
        }
        if let Some(dir) = lookup(ENV_LOCK_DIR) {
            self.lock.dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.lock.timeout_secs = secs,
                Err(_) => tracing::warn!(
                    "ignoring {}='{}': not a number of seconds",
                    ENV_LOCK_TIMEOUT_SECS,
                    raw
                ),
            }
        }
    }

    /// Path resolver for the configured journals.
    pub fn resolver(&self) -> JourResult<PathResolver> {
        if let Some(custom) = &self.custom_journal {
            return Ok(PathResolver::custom(absolutize(custom)?));
        }

        let machine = machine_name();
        let primary = match &self.journal {
            Some(path) => absolutize(path)?,
            None => require_home()?
                .join("Cartapacio")
                .join("Machines")
                .join(format!("Journal_of_{}.md", machine)),
        };
        let emergency = match &self.emergency_journal {
            Some(path) => absolutize(path)?,
            None => require_home()?
                .join("Desktop")
                .join(format!("Emergency_journal_{}.md", machine)),
        };
        Ok(PathResolver::new(primary, emergency, self.create_journal))
    }

    pub fn lock_spec(&self) -> LockSpec {
        LockSpec {
            name: self.lock.name.clone(),
            dir: self.lock.dir.clone().unwrap_or_else(env::temp_dir),
            timeout: Duration::from_secs(self.lock.timeout_secs),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            seed_signature: self.signature.clone(),
            backup: self.backup,
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Return the user's home directory.
///
/// Uses HOME on Unix-like systems and USERPROFILE on Windows.
pub fn home_dir() -> Option<PathBuf> {
    env_var("HOME")
        .or_else(|| env_var("USERPROFILE"))
        .map(PathBuf::from)
}

fn require_home() -> JourResult<PathBuf> {
    home_dir().ok_or_else(|| {
        JourError::config("neither HOME nor USERPROFILE is set; configure the journal paths")
    })
}

fn absolutize(path: &Path) -> JourResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.clean());
    }
    let cwd = env::current_dir()
        .map_err(|e| JourError::io(None, "resolve current directory", e))?;
    Ok(cwd.join(path).clean())
}

/// Short host name with the first letter upper-cased, e.g. `Mercury` for
/// `mercury.local`.
pub fn machine_name() -> String {
    let raw = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "machine".to_string());
    capitalize(raw.split('.').next().unwrap_or_default())
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
