// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! HTTP server for the Prometheus metrics endpoint
//!
//! The server owns its socket and a dedicated runtime: one thread accepts
//! connections and up to [`MAX_WORKERS`] blocking threads render scrapes.
//! All of them are named `prometheus-http-<pool>-<n>` and none of them keeps
//! the process alive.
//!
//! Lifecycle is `Created -> Running -> Stopped`. The socket is bound when the
//! server is created so that bind errors surface before anything starts.

use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{ExporterError, ExporterResult};
use crate::exposition::ExpositionEndpoint;
use crate::types::ServerConfig;
use prombridge_config::{check_metric_path, ConfigError};

/// Threads always present in the pool
pub const MIN_WORKERS: usize = 1;
/// Upper bound of concurrently rendered scrapes
pub const MAX_WORKERS: usize = 10;
/// Idle time before a surplus worker thread exits
pub const WORKER_KEEP_ALIVE: Duration = Duration::from_secs(120);
/// Default time a client gets to send the request head
pub const MAX_REQUEST_TIME: Duration = Duration::from_secs(60);
/// Time a render may take before the scrape is answered with 503
pub const MAX_RENDER_TIME: Duration = Duration::from_secs(600);

/// How long `stop` waits for in-flight requests
const STOP_GRACE: Duration = Duration::from_secs(5);

static POOL_NUMBER: AtomicUsize = AtomicUsize::new(1);

enum State {
    Created {
        listener: std::net::TcpListener,
        router: Router,
    },
    Running(Running),
    Stopped,
}

struct Running {
    runtime: Runtime,
    shutdown: watch::Sender<bool>,
    finished: mpsc::Receiver<()>,
}

/// HTTP server exposing one [`ExpositionEndpoint`]
pub struct HttpServer {
    state: Mutex<State>,
    local_addr: SocketAddr,
    path: String,
    request_timeout: Duration,
}

impl HttpServer {
    /// Bind the socket for `config`; the server does not accept until [`start`](Self::start)
    pub fn bind(config: &ServerConfig, endpoint: Arc<ExpositionEndpoint>) -> ExporterResult<Self> {
        if let Some(violation) = check_metric_path(&config.path) {
            return Err(ConfigError::Invalid(vec![violation]).into());
        }

        let addr = config.socket_addr();
        let bind_error = |source| ExporterError::Bind {
            addr: addr.clone(),
            source,
        };

        let listener =
            std::net::TcpListener::bind((config.bind_host(), config.port)).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let router = endpoint.router(&config.path, MAX_WORKERS, MAX_RENDER_TIME);
        debug!("Bound metrics server to {}", local_addr);

        Ok(Self {
            state: Mutex::new(State::Created { listener, router }),
            local_addr,
            path: config.path.clone(),
            request_timeout: MAX_REQUEST_TIME,
        })
    }

    /// Close connections whose request head is not complete within `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Start accepting connections
    pub fn start(&self) -> ExporterResult<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let (listener, router) = match std::mem::replace(&mut *state, State::Stopped) {
            State::Created { listener, router } => (listener, router),
            other => {
                *state = other;
                return Err(ExporterError::AlreadyStarted(self.local_addr.port()));
            }
        };

        let pool = POOL_NUMBER.fetch_add(1, Ordering::Relaxed);
        let thread_number = Arc::new(AtomicUsize::new(1));
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(MIN_WORKERS)
            .max_blocking_threads(MAX_WORKERS)
            .thread_keep_alive(WORKER_KEEP_ALIVE)
            .thread_name_fn(move || {
                let n = thread_number.fetch_add(1, Ordering::Relaxed);
                format!("prometheus-http-{}-{}", pool, n)
            })
            .enable_all()
            .build()
            .map_err(ExporterError::Runtime)?;

        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(listener).map_err(ExporterError::Runtime)?
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (finished_tx, finished_rx) = mpsc::channel();
        runtime.spawn(accept_loop(
            listener,
            router,
            self.request_timeout,
            shutdown_rx,
            finished_tx,
        ));

        *state = State::Running(Running {
            runtime,
            shutdown: shutdown_tx,
            finished: finished_rx,
        });

        info!(
            "Started HTTP server exposing Prometheus metrics on http://{}{}",
            self.local_addr, self.path
        );
        Ok(())
    }

    /// Stop accepting, let in-flight requests finish and release all threads.
    ///
    /// Safe to call on a server that never started or already stopped.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match std::mem::replace(&mut *state, State::Stopped) {
            State::Created { .. } => {
                debug!("Metrics server on {} released before start", self.local_addr);
            }
            State::Stopped => {}
            State::Running(running) => {
                if running.shutdown.send(true).is_err() {
                    debug!("Metrics server accept loop already gone");
                }
                if running.finished.recv_timeout(STOP_GRACE).is_err() {
                    debug!(
                        "Requests still in flight after {:?}, abandoning them",
                        STOP_GRACE
                    );
                }
                running.runtime.shutdown_background();
                info!("Stopped HTTP server on {}", self.local_addr);
            }
        }
    }

    /// Port actually bound, useful when the configured port was 0
    pub fn bound_port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Whether the server is accepting connections
    pub fn is_running(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, State::Running(_))
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Router,
    request_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
    finished: mpsc::Sender<()>,
) {
    let connections = TaskTracker::new();
    let mut builder = http1::Builder::new();
    builder
        .timer(TokioTimer::new())
        .header_read_timeout(request_timeout);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let service = TowerToHyperService::new(router.clone());
                    let connection = builder.serve_connection(TokioIo::new(stream), service);
                    let mut shutdown = shutdown.clone();

                    connections.spawn(async move {
                        let mut connection = std::pin::pin!(connection);
                        let mut draining = false;
                        let result = loop {
                            tokio::select! {
                                result = connection.as_mut() => break result,
                                _ = shutdown.changed(), if !draining => {
                                    draining = true;
                                    connection.as_mut().graceful_shutdown();
                                }
                            }
                        };
                        if let Err(e) = result {
                            debug!("Connection from {} ended with error: {}", peer, e);
                        }
                    });
                }
                Err(e) => warn!("Failed to accept metrics connection: {}", e),
            }
        }
    }

    // Release the port before draining.
    drop(listener);
    connections.close();
    connections.wait().await;
    let _ = finished.send(());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::RegistryExporter;
    use crate::registry::MetricRegistry;
    use crate::types::ExporterConfig;

    fn endpoint() -> Arc<ExpositionEndpoint> {
        let exporter = RegistryExporter::new(Arc::new(MetricRegistry::new()), &ExporterConfig::default());
        Arc::new(ExpositionEndpoint::new(Arc::new(exporter)))
    }

    #[test]
    fn test_ephemeral_port_is_reported() {
        let server = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "/metrics"), endpoint())
            .unwrap();
        assert_ne!(server.bound_port(), 0);
        assert!(!server.is_running());
    }

    #[test]
    fn test_state_machine() {
        let server = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "/metrics"), endpoint())
            .unwrap();

        server.start().unwrap();
        assert!(server.is_running());
        assert!(matches!(server.start(), Err(ExporterError::AlreadyStarted(_))));

        server.stop();
        assert!(!server.is_running());
        server.stop();
        assert!(server.start().is_err());
    }

    #[test]
    fn test_port_in_use_is_bind_error() {
        let first = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "/metrics"), endpoint())
            .unwrap();
        let err = HttpServer::bind(
            &ServerConfig::new("127.0.0.1", first.bound_port(), "/metrics"),
            endpoint(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ExporterError::Bind { .. }));
    }

    #[test]
    fn test_stop_releases_port() {
        let server = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "/metrics"), endpoint())
            .unwrap();
        let port = server.bound_port();
        server.start().unwrap();
        server.stop();

        assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn test_stalled_client_is_disconnected() {
        use std::io::{ErrorKind, Read, Write};

        let server = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "/metrics"), endpoint())
            .unwrap()
            .with_request_timeout(Duration::from_millis(200));
        server.start().unwrap();

        let mut stream = std::net::TcpStream::connect(server.local_addr()).unwrap();
        stream.write_all(b"GET /metrics HTTP/1.1\r\n").unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();

        let mut received = Vec::new();
        if let Err(e) = stream.read_to_end(&mut received) {
            assert!(
                !matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
                "connection still open: {}",
                e
            );
        }
        assert!(!String::from_utf8_lossy(&received).contains("200 OK"));

        server.stop();
    }

    #[test]
    fn test_bad_path_rejected_before_bind() {
        let err = HttpServer::bind(&ServerConfig::new("127.0.0.1", 0, "metrics"), endpoint())
            .err()
            .unwrap();
        assert!(err.to_string().contains("metric_path"));
    }
}
