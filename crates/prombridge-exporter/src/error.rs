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
//! Error types for the exporter

use prombridge_config::ConfigError;
use std::io;
use thiserror::Error;

/// Errors raised by the registry, the exporter and the HTTP server
#[derive(Error, Debug)]
pub enum ExporterError {
    /// The configuration was rejected before anything was bound
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listening socket could not be created
    #[error("Could not bind the HTTP server to {addr}: {source}")]
    Bind {
        /// Address as `host:port`
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be created
    #[error("Could not start the HTTP worker pool: {0}")]
    Runtime(#[source] io::Error),

    /// `start` was called on a server that already left the created state
    #[error("The HTTP server on port {0} has already been started")]
    AlreadyStarted(u16),

    /// `start` was called while an exporter instance is live
    #[error("The exporter is already running on port {0}")]
    AlreadyRunning(u16),

    /// A name is registered with a different metric type
    #[error("A metric named {name} already exists as a {existing}")]
    KindMismatch {
        /// Registry name
        name: String,
        /// Type of the registered metric
        existing: &'static str,
    },

    /// The shared collector registry refused the adapter
    #[error("Shared collector registry error: {0}")]
    Registry(#[from] prometheus::Error),

    /// Writing the exposition text failed
    #[error("Failed to render metrics: {0}")]
    Render(#[from] std::fmt::Error),
}

/// Result alias used throughout the crate
pub type ExporterResult<T> = Result<T, ExporterError>;
