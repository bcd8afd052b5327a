//! # Larkspur Conf
//!
//! Application settings.
//!
//! Settings are layered: built-in defaults, then a TOML document, then environment
//! variables prefixed with `LARKSPUR_`. Missing keys keep their default value.
//!
//! ```
//! use larkspur_conf::Settings;
//!
//! let settings = Settings::from_toml_str("debug = true\nworker_threads = 4").unwrap();
//! assert!(settings.debug);
//! assert_eq!(settings.worker_threads, 4);
//! assert_eq!(settings.log_filter, "info");
//! ```

use serde::Deserialize;
use std::path::Path;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "LARKSPUR_";

/// Default bound of the blocking worker pool
pub const DEFAULT_WORKER_THREADS: usize = 16;

/// Errors raised while loading settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ConfError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	/// An environment variable holds a value of the wrong type
	#[error("Invalid value for {key}: {reason}")]
	InvalidEnv { key: String, reason: String },

	#[error("Invalid settings: {0}")]
	Invalid(String),
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Include error text in unexpected-failure responses
	pub debug: bool,
	/// Maximum number of blocking handlers and components running at once
	pub worker_threads: usize,
	/// `tracing-subscriber` filter directive, e.g. `"info,larkspur_di=debug"`
	pub log_filter: String,
	pub app_name: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: false,
			worker_threads: DEFAULT_WORKER_THREADS,
			log_filter: "info".to_string(),
			app_name: "larkspur".to_string(),
		}
	}
}

impl Settings {
	/// Parses settings from a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfError> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}

	/// Reads settings from a TOML file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path)?;
		tracing::debug!(path = %path.display(), "Loading settings file");
		Self::from_toml_str(&source)
	}

	/// Applies `LARKSPUR_*` environment variables on top of these settings.
	pub fn with_env_overrides(self) -> Result<Self, ConfError> {
		self.with_overrides(|key| std::env::var(key).ok())
	}

	/// Applies overrides read through `lookup`, keyed by the full variable name.
	///
	/// # Examples
	///
	/// ```
	/// use larkspur_conf::Settings;
	///
	/// let settings = Settings::default()
	///     .with_overrides(|key| (key == "LARKSPUR_DEBUG").then(|| "yes".to_string()))
	///     .unwrap();
	/// assert!(settings.debug);
	/// ```
	pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| {
			let key = format!("{}{}", ENV_PREFIX, name);
			lookup(&key).map(|value| (key, value))
		};

		if let Some((key, value)) = var("DEBUG") {
			self.debug = parse_bool(&value).ok_or_else(|| ConfError::InvalidEnv {
				key,
				reason: format!("expected a boolean, got {:?}", value),
			})?;
		}
		if let Some((key, value)) = var("WORKER_THREADS") {
			self.worker_threads =
				value
					.trim()
					.parse()
					.map_err(|e: std::num::ParseIntError| ConfError::InvalidEnv {
						key,
						reason: e.to_string(),
					})?;
		}
		if let Some((_, value)) = var("LOG_FILTER") {
			self.log_filter = value;
		}
		if let Some((_, value)) = var("APP_NAME") {
			self.app_name = value;
		}

		self.validate()?;
		Ok(self)
	}

	/// Checks cross-field constraints.
	pub fn validate(&self) -> Result<(), ConfError> {
		if self.worker_threads == 0 {
			return Err(ConfError::Invalid(
				"worker_threads must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Some(true),
		"0" | "false" | "no" | "off" | "" => Some(false),
		_ => None,
	}
}
