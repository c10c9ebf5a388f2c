//! Run configuration.

use serde::{Deserialize, Serialize};

/// Configuration stored in `itemmerge.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Configuration version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Merge defaults.
    #[serde(default)]
    pub merge: MergeSettings,

    /// Report defaults.
    #[serde(default)]
    pub output: OutputSettings,
}

fn default_version() -> u32 {
    1
}

fn default_merge_existing() -> bool {
    true
}

/// Defaults applied to batches that do not set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Run the merge passes before appending.
    #[serde(default = "default_merge_existing")]
    pub merge_existing: bool,

    /// Group label used when a batch names no destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination: Option<String>,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            merge_existing: default_merge_existing(),
            default_destination: None,
        }
    }
}

/// Format for run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

/// Report settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            version: 1,
            merge: MergeSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

impl RunConfig {
    /// Create a config that sends unlabelled batches to `destination`.
    #[must_use]
    pub fn with_default_destination(destination: impl Into<String>) -> Self {
        Self {
            merge: MergeSettings {
                default_destination: Some(destination.into()),
                ..MergeSettings::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RunConfig =
            serde_yaml::from_str("merge:\n  default_destination: main\n").unwrap();

        assert_eq!(config.version, 1);
        assert!(config.merge.merge_existing);
        assert_eq!(config.merge.default_destination.as_deref(), Some("main"));
        assert_eq!(config.output.format, ReportFormat::Human);
    }
}
