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
//! Configuration for the prombridge exporter
//!
//! Reads the exporter settings (`port`, `ip`, `metric_path` and the optional
//! `suffix` and `labels`) from the extension home and validates them before
//! anything binds a socket.
//!
//! # Features
//!
//! - `key=value` properties files, plus TOML, YAML and JSON documents
//! - Every missing key, and every invalid value, reported in one error
//! - Fallback to the legacy file location with a one-time warning
//!
//! # Example
//!
//! ```no_run
//! use prombridge_config::{ConfigLoader, ConfigResolver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = ConfigResolver::with_defaults("/opt/broker/extensions/prombridge", "prombridge");
//!     let config = ConfigLoader::new().load_file(resolver.resolve())?;
//!
//!     println!("Serving {} on {}", config.metric_path, config.socket_addr());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult, Violation};
pub use loader::{parse_properties, ConfigFormat, ConfigLoader};
pub use resolver::ConfigResolver;
pub use schema::*;
pub use validation::{check_ip, check_metric_path, check_port, Validator};
