//! Start and stop of one exporter instance
//!
//! Start builds exporter, endpoint and server, then registers with the shared
//! collector registry. Stop reverses that: unregister first so no scrape sees
//! a half torn down exporter, then stop the server. The running instance
//! lives in a single mutex-guarded slot, so concurrent `start`/`stop` calls
//! can never leave two live servers or an orphaned registration.

use prombridge_config::{ExtensionConfig, Validator};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::collector::{CollectorRegistry, ExporterCollector};
use crate::error::{ExporterError, ExporterResult};
use crate::exporter::RegistryExporter;
use crate::exposition::ExpositionEndpoint;
use crate::registry::MetricSource;
use crate::server::HttpServer;
use crate::types::{ExporterConfig, ServerConfig};

struct RunningExporter {
    server: HttpServer,
    collector: ExporterCollector,
    registered: bool,
}

/// Owns at most one running exporter
#[derive(Default)]
pub struct PrometheusExporter {
    current: Mutex<Option<RunningExporter>>,
    shared: Option<Arc<dyn CollectorRegistry>>,
}

impl PrometheusExporter {
    /// Exporter without a shared collector registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Exporter that also registers with `registry` while running
    pub fn with_shared_registry(registry: Arc<dyn CollectorRegistry>) -> Self {
        Self {
            current: Mutex::new(None),
            shared: Some(registry),
        }
    }

    /// Validate `config`, bind and start the server, register the adapter.
    ///
    /// Nothing stays bound when this fails.
    pub fn start(&self, config: &ExtensionConfig, source: Arc<dyn MetricSource>) -> ExporterResult<()> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = current.as_ref() {
            return Err(ExporterError::AlreadyRunning(running.server.bound_port()));
        }

        config.validate()?;
        let exporter_config = ExporterConfig::from_extension(config);
        let server_config = ServerConfig::from_extension(config)?;

        let exporter = Arc::new(RegistryExporter::new(source, &exporter_config));
        let collector = ExporterCollector::new(Arc::clone(&exporter))?;
        let endpoint = Arc::new(ExpositionEndpoint::new(exporter));

        let server = HttpServer::bind(&server_config, endpoint)?;
        server.start()?;

        let registered = match &self.shared {
            Some(shared) => match shared.register(collector.clone()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Could not register with the shared collector registry: {}", e);
                    false
                }
            },
            None => false,
        };

        info!(
            port = server.bound_port(),
            path = %server_config.path,
            "Prometheus exporter started"
        );
        *current = Some(RunningExporter {
            server,
            collector,
            registered,
        });
        Ok(())
    }

    /// Unregister and stop; a no-op when nothing is running
    pub fn stop(&self) {
        // Held until the server is down so a concurrent start cannot overlap.
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(running) = current.take() else {
            return;
        };

        if running.registered {
            if let Some(shared) = &self.shared {
                if let Err(e) = shared.unregister(&running.collector) {
                    debug!("Shared collector registry unregistration failed: {}", e);
                }
            }
        }
        running.server.stop();
        info!("Prometheus exporter stopped");
    }

    /// Whether an instance is running
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Port of the running instance
    pub fn bound_port(&self) -> Option<u16> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|running| running.server.bound_port())
    }
}

impl Drop for PrometheusExporter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MetricRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingRegistry {
        registered: AtomicUsize,
        unregistered: AtomicUsize,
    }

    impl CollectorRegistry for RecordingRegistry {
        fn register(&self, _collector: ExporterCollector) -> ExporterResult<()> {
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn unregister(&self, _collector: &ExporterCollector) -> ExporterResult<()> {
            self.unregistered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn free_port() -> i64 {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
        i64::from(listener.local_addr().unwrap().port())
    }

    #[test]
    fn test_stop_without_start() {
        let exporter = PrometheusExporter::new();
        exporter.stop();
        exporter.stop();
        assert!(!exporter.is_running());
    }

    #[test]
    fn test_registration_follows_lifecycle() {
        let shared = Arc::new(RecordingRegistry::default());
        let exporter = PrometheusExporter::with_shared_registry(shared.clone());
        let config = ExtensionConfig::new("127.0.0.1", free_port(), "/metrics");

        exporter
            .start(&config, Arc::new(MetricRegistry::new()))
            .unwrap();
        assert!(exporter.is_running());
        assert_eq!(shared.registered.load(Ordering::SeqCst), 1);

        let again = exporter.start(&config, Arc::new(MetricRegistry::new()));
        assert!(matches!(again, Err(ExporterError::AlreadyRunning(_))));

        exporter.stop();
        exporter.stop();
        assert_eq!(shared.unregistered.load(Ordering::SeqCst), 1);
        assert_eq!(exporter.bound_port(), None);
    }

    #[test]
    fn test_invalid_config_never_starts() {
        let shared = Arc::new(RecordingRegistry::default());
        let exporter = PrometheusExporter::with_shared_registry(shared.clone());

        let err = exporter
            .start(
                &ExtensionConfig::new("127.0.0.1", 70000, "/metrics"),
                Arc::new(MetricRegistry::new()),
            )
            .unwrap_err();
        assert!(err.to_string().contains("port"));
        assert!(!exporter.is_running());
        assert_eq!(shared.registered.load(Ordering::SeqCst), 0);
    }
}
