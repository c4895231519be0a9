//! Registry names and values to Prometheus samples

use tracing::info;

use crate::types::{ExporterConfig, Sample};

/// Label added to every quantile sample
pub const QUANTILE_LABEL: &str = "quantile";

/// Builds samples with the exporter's suffix and static labels applied
#[derive(Debug, Clone)]
pub struct SampleBuilder {
    suffix: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
}

impl SampleBuilder {
    /// Capture the decoration of `config`
    pub fn new(config: &ExporterConfig) -> Self {
        let (label_names, label_values) = config.labels.iter().cloned().unzip();
        Self {
            suffix: config.suffix.clone(),
            label_names,
            label_values,
        }
    }

    /// Build a sample for the registry name `raw_name`.
    ///
    /// `name_suffix` (`_total`, `_count`) is appended before the configured
    /// suffix; `labels` come before the static labels.
    pub fn build(
        &self,
        raw_name: &str,
        name_suffix: Option<&str>,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Sample {
        let mut name = String::with_capacity(raw_name.len() + self.suffix.len() + 8);
        name.push_str(raw_name);
        if let Some(name_suffix) = name_suffix {
            name.push_str(name_suffix);
        }
        if !self.suffix.is_empty() {
            name.push('_');
            name.push_str(&self.suffix);
        }

        let mut label_names = Vec::with_capacity(labels.len() + self.label_names.len());
        let mut label_values = Vec::with_capacity(labels.len() + self.label_values.len());
        for (label, label_value) in labels {
            label_names.push((*label).to_string());
            label_values.push((*label_value).to_string());
        }
        label_names.extend(self.label_names.iter().cloned());
        label_values.extend(self.label_values.iter().cloned());

        Sample {
            name: sanitize_metric_name(&name),
            label_names,
            label_values,
            value,
        }
    }
}

/// Replace every character outside `[a-zA-Z0-9_:]` with `_`, and prefix `_`
/// when the name starts with a digit
pub fn sanitize_metric_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len() + 1);
    if name.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        sanitized.push('_');
    }
    sanitized.extend(name.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' || c == ':' {
            c
        } else {
            '_'
        }
    }));
    sanitized
}

/// Parse `name=value;name=value` into ordered pairs.
///
/// Names and values are trimmed. Pairs that do not split into exactly two
/// non-empty tokens, or whose name is not a usable label name, are skipped.
pub fn parse_static_labels(declaration: &str) -> Vec<(String, String)> {
    let mut labels: Vec<(String, String)> = Vec::new();

    for pair in declaration.split(';') {
        if pair.trim().is_empty() {
            continue;
        }

        let tokens: Vec<&str> = pair.split('=').filter(|t| !t.is_empty()).collect();
        let (name, value) = match tokens.as_slice() {
            [name, value] if !name.trim().is_empty() && !value.trim().is_empty() => {
                (name.trim(), value.trim())
            }
            _ => {
                info!(
                    "Skipping invalid label '{}' for Prometheus in labels '{}'.",
                    pair, declaration
                );
                continue;
            }
        };

        if !is_valid_label_name(name) || name == QUANTILE_LABEL {
            info!(
                "Skipping label '{}' for Prometheus in labels '{}': '{}' is not a usable label name.",
                pair, declaration, name
            );
            continue;
        }
        if labels.iter().any(|(existing, _)| existing == name) {
            info!(
                "Skipping duplicate label '{}' for Prometheus in labels '{}'.",
                pair, declaration
            );
            continue;
        }

        labels.push((name.to_string(), value.to_string()));
    }

    labels
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && !name.starts_with("__")
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(suffix: &str, labels: &str) -> SampleBuilder {
        SampleBuilder::new(
            &ExporterConfig::default()
                .with_suffix(suffix)
                .with_label_declaration(labels),
        )
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_metric_name("com.broker.messages"), "com_broker_messages");
        assert_eq!(sanitize_metric_name("a-b c:d"), "a_b_c:d");
        assert_eq!(sanitize_metric_name("1st"), "_1st");
        assert_eq!(sanitize_metric_name("größe"), "gr__e");
        assert_eq!(sanitize_metric_name(""), "_");
    }

    #[test]
    fn test_meter_with_suffix() {
        let sample = builder("cluster1", "").build("requests", Some("_total"), &[], 3.0);
        assert_eq!(sample.name, "requests_total_cluster1");
        assert!(sample.label_names.is_empty());
    }

    #[test]
    fn test_suffix_is_sanitized() {
        let sample = builder("eu-west.1", "").build("x", None, &[], 1.0);
        assert_eq!(sample.name, "x_eu_west_1");
    }

    #[test]
    fn test_static_labels_follow_call_site_labels() {
        let sample = builder("", "a=1;b=2").build("latency", None, &[("quantile", "0.5")], 1.0);
        assert_eq!(sample.label_names, vec!["quantile", "a", "b"]);
        assert_eq!(sample.label_values, vec!["0.5", "1", "2"]);
        assert_eq!(sample.label("b"), Some("2"));
    }

    #[test]
    fn test_labels_trimmed() {
        let labels = parse_static_labels("  dc = eu-west ;rack=r1 ");
        assert_eq!(
            labels,
            vec![
                ("dc".to_string(), "eu-west".to_string()),
                ("rack".to_string(), "r1".to_string())
            ]
        );
    }

    #[test]
    fn test_malformed_labels_skipped() {
        assert!(parse_static_labels("").is_empty());
        assert!(parse_static_labels("novalue").is_empty());
        assert!(parse_static_labels("a=1=2").is_empty());
        assert!(parse_static_labels("= 1").is_empty());
        assert!(parse_static_labels("a= ").is_empty());
        assert!(parse_static_labels("bad-name=1;__reserved=1;quantile=1").is_empty());

        let labels = parse_static_labels("broken;a=1;a=2;;b=2");
        let names: Vec<&str> = labels.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(labels[0].1, "1");
    }
}
