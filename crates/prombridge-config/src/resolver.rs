//! Locating the configuration file inside the extension home.

use crate::schema::{CONFIG_LOCATION, LEGACY_CONFIG_LOCATION};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Picks between the current and the legacy configuration location.
///
/// The legacy file wins whenever it exists so that upgrades keep working,
/// and its use is reported once per resolver.
#[derive(Debug)]
pub struct ConfigResolver {
    home: PathBuf,
    extension_name: String,
    config_location: PathBuf,
    legacy_location: PathBuf,
    legacy_warned: AtomicBool,
}

impl ConfigResolver {
    /// Resolver with explicit locations, both relative to `home`
    pub fn new(
        home: impl Into<PathBuf>,
        extension_name: impl Into<String>,
        config_location: impl Into<PathBuf>,
        legacy_location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            home: home.into(),
            extension_name: extension_name.into(),
            config_location: config_location.into(),
            legacy_location: legacy_location.into(),
            legacy_warned: AtomicBool::new(false),
        }
    }

    /// Resolver using the standard locations
    pub fn with_defaults(home: impl Into<PathBuf>, extension_name: impl Into<String>) -> Self {
        Self::new(home, extension_name, CONFIG_LOCATION, LEGACY_CONFIG_LOCATION)
    }

    /// Extension home directory
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Path to read the configuration from
    pub fn resolve(&self) -> PathBuf {
        let legacy = self.home.join(&self.legacy_location);
        if legacy.exists() {
            if !self.legacy_warned.swap(true, Ordering::SeqCst) {
                warn!(
                    "{}: The configuration file is placed at the legacy location '{}'. \
                     Please move the configuration file to '{}'. \
                     Support for the legacy location will be removed in a future release.",
                    self.extension_name,
                    legacy.display(),
                    self.home.join(&self.config_location).display()
                );
            }
            return legacy;
        }
        self.home.join(&self.config_location)
    }
}
