//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber writing formatted events to stdout. The
//! filter comes from `RUST_LOG` when it is set and parses, and from
//! [`Settings::log_filter`] otherwise.

use larkspur_conf::Settings;
use larkspur_exception::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Builds the event filter for `settings`.
///
/// # Errors
///
/// [`Error::Configuration`] when `RUST_LOG` is unset and the configured filter does
/// not parse.
///
/// # Examples
///
/// ```rust
/// use larkspur::Settings;
///
/// let settings = Settings {
///     log_filter: "larkspur_urls=debug,warn".to_string(),
///     ..Settings::default()
/// };
/// assert!(larkspur::logging::filter(&settings).is_ok());
/// ```
pub fn filter(settings: &Settings) -> Result<EnvFilter> {
	if let Ok(filter) = EnvFilter::try_from_default_env() {
		return Ok(filter);
	}
	EnvFilter::try_new(&settings.log_filter).map_err(|e| {
		Error::Configuration(format!("invalid log filter '{}': {}", settings.log_filter, e))
	})
}

/// Installs the global subscriber.
///
/// Calling it again once a global subscriber is installed leaves the existing one in
/// place.
///
/// # Errors
///
/// [`Error::Configuration`] when the filter does not parse.
pub fn init(settings: &Settings) -> Result<()> {
	let fmt_layer = fmt::layer().with_target(true);
	if let Err(e) = tracing_subscriber::registry()
		.with(filter(settings)?)
		.with(fmt_layer)
		.try_init()
	{
		tracing::debug!(error = %e, "Global subscriber already installed");
		return Ok(());
	}

	tracing::info!(
		app = %settings.app_name,
		debug = settings.debug,
		filter = %settings.log_filter,
		"Logging initialized"
	);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_invalid_filter_is_a_configuration_error() {
		// Arrange
		let settings = Settings {
			log_filter: "larkspur=[".to_string(),
			..Settings::default()
		};

		// Act
		let result = filter(&settings);

		// Assert
		if std::env::var_os("RUST_LOG").is_none() {
			assert!(result.unwrap_err().is_configuration());
		}
	}

	#[rstest]
	fn test_repeated_init_is_harmless() {
		let settings = Settings::default();

		let first = init(&settings);
		let second = init(&settings);

		assert!(first.is_ok());
		assert!(second.is_ok());
	}
}
