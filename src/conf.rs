//! Application settings.
//!
//! ```rust
//! use larkspur::conf::Settings;
//!
//! let settings = Settings::from_toml_str("debug = true\nworker_threads = 4").unwrap();
//! assert!(settings.debug);
//! assert_eq!(settings.worker_threads, 4);
//! ```

pub use larkspur_conf::*;
