use crate::error::{ConfigError, ConfigResult, Violation};
use crate::schema::{ExtensionConfig, IP_KEY, MAX_PORT, METRIC_PATH_KEY, MIN_PORT, PORT_KEY};

/// Validator for configuration settings
pub trait Validator {
    /// Check every rule, reporting all broken ones at once
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for ExtensionConfig {
    fn validate(&self) -> ConfigResult<()> {
        let violations = self.violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(violations))
        }
    }
}

impl ExtensionConfig {
    /// All rules this configuration breaks, in key order port, metric_path, ip
    pub fn violations(&self) -> Vec<Violation> {
        [
            check_port(self.port),
            check_metric_path(&self.metric_path),
            check_ip(&self.ip),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Port must lie within 1-65535
pub fn check_port(port: i64) -> Option<Violation> {
    if port < MIN_PORT {
        return Some(Violation::new(
            PORT_KEY,
            format!(
                "The port must not be smaller than {}. Value was {}.",
                MIN_PORT, port
            ),
        ));
    }
    if port > MAX_PORT {
        return Some(Violation::new(
            PORT_KEY,
            format!(
                "The port must not be greater than {}. Value was {}.",
                MAX_PORT, port
            ),
        ));
    }
    None
}

/// Address must contain something besides whitespace
pub fn check_ip(ip: &str) -> Option<Violation> {
    if ip.trim().is_empty() {
        return Some(Violation::new(IP_KEY, "The ip must not be blank."));
    }
    None
}

/// Path must be absolute and made only of characters a router takes literally
pub fn check_metric_path(path: &str) -> Option<Violation> {
    if !path.starts_with('/') {
        return Some(Violation::new(
            METRIC_PATH_KEY,
            "The metric_path must begin with a slash, f.e. \"/metrics\".",
        ));
    }

    if let Some(bad) = path.chars().find(|c| !is_literal_path_char(*c)) {
        return Some(Violation::new(
            METRIC_PATH_KEY,
            format!(
                "The metric_path must only contain letters, digits and '/', '.', '_', '~', '-'. Found '{}'.",
                bad
            ),
        ));
    }

    None
}

fn is_literal_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '~' | '-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ExtensionConfig::new("127.0.0.1", 9399, "/metrics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_port_too_large() {
        let err = ExtensionConfig::new("127.0.0.1", 70000, "/metrics")
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["port"]);
        assert!(err.to_string().contains("65535"));
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn test_port_zero_rejected() {
        let violation = check_port(0).unwrap();
        assert_eq!(violation.field, "port");
        assert!(violation.reason.contains("smaller than 1"));
    }

    #[test]
    fn test_path_without_slash() {
        let err = ExtensionConfig::new("127.0.0.1", 9399, "metrics")
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["metric_path"]);
        assert!(err.to_string().contains("metric_path"));
    }

    #[test]
    fn test_path_with_route_syntax() {
        assert!(check_metric_path("/{id}").is_some());
        assert!(check_metric_path("/:id").is_some());
        assert!(check_metric_path("/*rest").is_some());
        assert!(check_metric_path("/").is_none());
        assert!(check_metric_path("/my-metrics/v1.0").is_none());
    }

    #[test]
    fn test_blank_ip() {
        assert!(check_ip("   ").is_some());
        assert!(check_ip("").is_some());
        assert!(check_ip("localhost").is_none());
    }

    #[test]
    fn test_all_violations_reported_together() {
        let config = ExtensionConfig::new(" ", 0, "metrics");
        let fields: Vec<String> = config.violations().into_iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["port", "metric_path", "ip"]);
    }
}
