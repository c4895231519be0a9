//! Host plugin glue
//!
//! The host hands the extension its home directory and the live metric
//! registry on start, and expects either success or a reason to prevent
//! startup. Stop must release everything and tolerate never having started.

use prombridge_config::{ConfigError, ConfigLoader, ConfigResolver, ExtensionConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::collector::CollectorRegistry;
use crate::lifecycle::PrometheusExporter;
use crate::registry::MetricSource;

/// Name the extension reports to the host
pub const EXTENSION_NAME: &str = "Prometheus Monitoring Extension";

/// What the host knows about an installed extension
#[derive(Debug, Clone)]
pub struct ExtensionInformation {
    /// Display name
    pub name: String,
    /// Extension home directory
    pub home: PathBuf,
}

impl ExtensionInformation {
    /// Information for an extension installed at `home`
    pub fn new(name: impl Into<String>, home: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            home: home.into(),
        }
    }
}

/// Input handed to [`ExtensionMain::extension_start`]
pub struct ExtensionStartInput {
    /// Where the extension is installed
    pub information: ExtensionInformation,
    /// The host's metric registry
    pub metric_registry: Arc<dyn MetricSource>,
}

/// Start outcome reported back to the host
#[derive(Debug, Default)]
pub struct ExtensionStartOutput {
    prevented: Option<String>,
}

impl ExtensionStartOutput {
    /// Refuse startup with `reason`
    pub fn prevent_startup(&mut self, reason: impl Into<String>) {
        self.prevented = Some(reason.into());
    }

    /// Reason startup was refused, if it was
    pub fn startup_prevented(&self) -> Option<&str> {
        self.prevented.as_deref()
    }
}

/// Start and stop hooks the host calls
pub trait ExtensionMain {
    /// Called once when the host starts the extension
    fn extension_start(&self, input: &ExtensionStartInput, output: &mut ExtensionStartOutput);

    /// Called once when the host stops the extension
    fn extension_stop(&self);
}

/// Prometheus exporter packaged as a host extension
#[derive(Default)]
pub struct PrometheusExtension {
    exporter: PrometheusExporter,
    config_path: Option<PathBuf>,
}

impl PrometheusExtension {
    /// Extension without a shared collector registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Extension registering its collector with `registry` while running
    pub fn with_shared_registry(registry: Arc<dyn CollectorRegistry>) -> Self {
        Self {
            exporter: PrometheusExporter::with_shared_registry(registry),
            config_path: None,
        }
    }

    /// Read the configuration from `path` instead of resolving it in the home
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Port of the running exporter
    pub fn bound_port(&self) -> Option<u16> {
        self.exporter.bound_port()
    }

    fn read_configuration(&self, information: &ExtensionInformation) -> Result<ExtensionConfig, String> {
        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => ConfigResolver::with_defaults(&information.home, &information.name).resolve(),
        };

        ConfigLoader::new()
            .load_file(&path)
            .map_err(|e| startup_message(&path, e))
    }
}

fn startup_message(path: &Path, error: ConfigError) -> String {
    match error {
        ConfigError::FileNotFound(_) | ConfigError::IoError(_) => {
            format!("The configuration file: {} could not be read", path.display())
        }
        e @ (ConfigError::MissingRequired(_) | ConfigError::Invalid(_)) => e.to_string(),
        e => format!("Unknown error while reading configuration file: {}", e),
    }
}

impl ExtensionMain for PrometheusExtension {
    fn extension_start(&self, input: &ExtensionStartInput, output: &mut ExtensionStartOutput) {
        let config = match self.read_configuration(&input.information) {
            Ok(config) => config,
            Err(reason) => {
                output.prevent_startup(reason);
                return;
            }
        };

        if let Err(e) = self
            .exporter
            .start(&config, Arc::clone(&input.metric_registry))
        {
            output.prevent_startup(e.to_string());
            return;
        }
        info!("{} started", input.information.name);
    }

    fn extension_stop(&self) {
        self.exporter.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use std::fs;

    fn input(home: &Path) -> ExtensionStartInput {
        ExtensionStartInput {
            information: ExtensionInformation::new(EXTENSION_NAME, home),
            metric_registry: Arc::new(MetricRegistry::new()),
        }
    }

    #[test]
    fn test_missing_file_prevents_startup() {
        let home = tempfile::tempdir().unwrap();
        let extension = PrometheusExtension::new();
        let mut output = ExtensionStartOutput::default();

        extension.extension_start(&input(home.path()), &mut output);

        let reason = output.startup_prevented().unwrap();
        assert!(reason.starts_with("The configuration file: "));
        assert!(reason.ends_with("conf/config.properties could not be read"));
        extension.extension_stop();
    }

    #[test]
    fn test_invalid_file_prevents_startup() {
        let home = tempfile::tempdir().unwrap();
        fs::create_dir_all(home.path().join("conf")).unwrap();
        fs::write(
            home.path().join("conf/config.properties"),
            "port=9399\nip=127.0.0.1\nmetric_path=metrics\n",
        )
        .unwrap();

        let extension = PrometheusExtension::new();
        let mut output = ExtensionStartOutput::default();
        extension.extension_start(&input(home.path()), &mut output);

        let reason = output.startup_prevented().unwrap();
        assert!(reason.contains("metric_path"), "{}", reason);
        assert_eq!(extension.bound_port(), None);
    }

    #[test]
    fn test_start_and_stop() {
        let port = std::net::TcpListener::bind(("127.0.0.1", 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let home = tempfile::tempdir().unwrap();
        let config = home.path().join("custom.properties");
        fs::write(
            &config,
            format!("port={}\nip=127.0.0.1\nmetric_path=/metrics\n", port),
        )
        .unwrap();

        let extension = PrometheusExtension::new().with_config_path(&config);
        let mut output = ExtensionStartOutput::default();
        extension.extension_start(&input(home.path()), &mut output);

        assert_eq!(output.startup_prevented(), None);
        assert_eq!(extension.bound_port(), Some(port));
        extension.extension_stop();
        extension.extension_stop();
        assert_eq!(extension.bound_port(), None);
    }
}
