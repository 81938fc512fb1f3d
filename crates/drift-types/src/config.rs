//! Engine configuration: defaults, partial updates, validation, env loading.
//!
//! Every way of producing a [`DriftConfig`] funnels through [`DriftConfig::validate`];
//! bad values are rejected with the offending field named, never clamped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("unknown traversal direction: {0:?} (expected forward, backward or bidirectional)")]
    UnknownDirection(String),
    #[error("unknown inference strategy: {0:?} (expected semantic, similarity or structural)")]
    UnknownStrategy(String),
    #[error("environment variable {var}: {reason}")]
    Env { var: String, reason: String },
}

impl ConfigError {
    /// Name of the configuration field the error is about.
    pub fn field(&self) -> &str {
        match self {
            ConfigError::InvalidValue { field, .. } => field,
            ConfigError::UnknownDirection(_) => "direction",
            ConfigError::UnknownStrategy(_) => "inference_strategy",
            ConfigError::Env { var, .. } => var,
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Which edges the traversal follows from the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TraversalDirection {
    /// Outgoing edges only.
    Forward,
    /// Incoming edges only.
    Backward,
    #[default]
    Bidirectional,
}

impl TraversalDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TraversalDirection::Forward => "forward",
            TraversalDirection::Backward => "backward",
            TraversalDirection::Bidirectional => "bidirectional",
        }
    }

    pub fn follows_outgoing(self) -> bool {
        matches!(
            self,
            TraversalDirection::Forward | TraversalDirection::Bidirectional
        )
    }

    pub fn follows_incoming(self) -> bool {
        matches!(
            self,
            TraversalDirection::Backward | TraversalDirection::Bidirectional
        )
    }
}

impl fmt::Display for TraversalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraversalDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(TraversalDirection::Forward),
            "backward" => Ok(TraversalDirection::Backward),
            "bidirectional" => Ok(TraversalDirection::Bidirectional),
            _ => Err(ConfigError::UnknownDirection(s.to_string())),
        }
    }
}

impl TryFrom<String> for TraversalDirection {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TraversalDirection> for String {
    fn from(value: TraversalDirection) -> Self {
        value.as_str().to_string()
    }
}

/// How the inference engine measures overlap between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InferenceStrategy {
    /// Shared terms in node content.
    #[default]
    Semantic,
    /// Cosine similarity of node embeddings.
    Similarity,
    /// Shared neighbours in the graph.
    Structural,
}

impl InferenceStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            InferenceStrategy::Semantic => "semantic",
            InferenceStrategy::Similarity => "similarity",
            InferenceStrategy::Structural => "structural",
        }
    }
}

impl fmt::Display for InferenceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(InferenceStrategy::Semantic),
            "similarity" => Ok(InferenceStrategy::Similarity),
            "structural" => Ok(InferenceStrategy::Structural),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for InferenceStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InferenceStrategy> for String {
    fn from(value: InferenceStrategy) -> Self {
        value.as_str().to_string()
    }
}

/// Configuration for one retrieval engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Number of seed nodes requested from the similarity index.
    pub entry_point_count: usize,
    /// Maximum number of hops from a seed.
    pub max_depth: usize,
    pub direction: TraversalDirection,
    /// Number of ranked paths handed to synthesis.
    pub top_k_paths: usize,
    /// Paths scoring below this are discarded before selection.
    pub min_path_score: f64,
    pub enable_inference: bool,
    pub inference_strategy: InferenceStrategy,
    /// Inferred connections below this confidence are dropped.
    pub inference_confidence_threshold: f64,
    pub max_inferences: usize,
    pub inference_cache_enabled: bool,
    /// Capacity of the inference cache (entries).
    pub inference_cache_size: usize,
    /// Append the provenance section to answers by default.
    pub include_provenance: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            entry_point_count: 3,
            max_depth: 3,
            direction: TraversalDirection::Bidirectional,
            top_k_paths: 5,
            min_path_score: 0.3,
            enable_inference: true,
            inference_strategy: InferenceStrategy::Semantic,
            inference_confidence_threshold: 0.3,
            max_inferences: 10,
            inference_cache_enabled: true,
            inference_cache_size: 100,
            include_provenance: true,
        }
    }
}

impl DriftConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_point_count == 0 {
            return Err(ConfigError::invalid(
                "entry_point_count",
                "must be greater than 0",
            ));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::invalid("max_depth", "must be greater than 0"));
        }
        if self.top_k_paths == 0 {
            return Err(ConfigError::invalid("top_k_paths", "must be greater than 0"));
        }
        check_unit("min_path_score", self.min_path_score)?;
        check_unit(
            "inference_confidence_threshold",
            self.inference_confidence_threshold,
        )?;
        if self.max_inferences == 0 {
            return Err(ConfigError::invalid(
                "max_inferences",
                "must be greater than 0",
            ));
        }
        if self.inference_cache_size == 0 {
            return Err(ConfigError::invalid(
                "inference_cache_size",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Validate and return `self`, for construction chains.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    /// Overlay `update` on a copy of this config. The copy is returned only if it validates;
    /// `self` is never touched.
    pub fn apply(&self, update: &ConfigUpdate) -> Result<Self, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.entry_point_count {
            next.entry_point_count = v;
        }
        if let Some(v) = update.max_depth {
            next.max_depth = v;
        }
        if let Some(v) = update.direction {
            next.direction = v;
        }
        if let Some(v) = update.top_k_paths {
            next.top_k_paths = v;
        }
        if let Some(v) = update.min_path_score {
            next.min_path_score = v;
        }
        if let Some(v) = update.enable_inference {
            next.enable_inference = v;
        }
        if let Some(v) = update.inference_strategy {
            next.inference_strategy = v;
        }
        if let Some(v) = update.inference_confidence_threshold {
            next.inference_confidence_threshold = v;
        }
        if let Some(v) = update.max_inferences {
            next.max_inferences = v;
        }
        if let Some(v) = update.inference_cache_enabled {
            next.inference_cache_enabled = v;
        }
        if let Some(v) = update.inference_cache_size {
            next.inference_cache_size = v;
        }
        if let Some(v) = update.include_provenance {
            next.include_provenance = v;
        }
        next.validated()
    }

    /// Defaults overlaid with `DRIFT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`DriftConfig::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let update = ConfigUpdate {
            entry_point_count: parse_var(&lookup, "DRIFT_ENTRY_POINTS")?,
            max_depth: parse_var(&lookup, "DRIFT_MAX_DEPTH")?,
            direction: parse_var(&lookup, "DRIFT_DIRECTION")?,
            top_k_paths: parse_var(&lookup, "DRIFT_TOP_K_PATHS")?,
            min_path_score: parse_var(&lookup, "DRIFT_MIN_PATH_SCORE")?,
            enable_inference: parse_var(&lookup, "DRIFT_ENABLE_INFERENCE")?,
            inference_strategy: parse_var(&lookup, "DRIFT_INFERENCE_STRATEGY")?,
            ..ConfigUpdate::default()
        };
        Self::default().apply(&update)
    }
}

/// Partial configuration change. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigUpdate {
    pub entry_point_count: Option<usize>,
    pub max_depth: Option<usize>,
    pub direction: Option<TraversalDirection>,
    pub top_k_paths: Option<usize>,
    pub min_path_score: Option<f64>,
    pub enable_inference: Option<bool>,
    pub inference_strategy: Option<InferenceStrategy>,
    pub inference_confidence_threshold: Option<f64>,
    pub max_inferences: Option<usize>,
    pub inference_cache_enabled: Option<bool>,
    pub inference_cache_size: Option<usize>,
    pub include_provenance: Option<bool>,
}

fn check_unit(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(
            field,
            format!("must be within [0, 1], got {}", value),
        ));
    }
    Ok(())
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Env {
                var: var.to_string(),
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = DriftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_path_score, 0.3);
    }

    #[test]
    fn zero_counts_are_rejected() {
        for (update, field) in [
            (
                ConfigUpdate {
                    entry_point_count: Some(0),
                    ..Default::default()
                },
                "entry_point_count",
            ),
            (
                ConfigUpdate {
                    max_depth: Some(0),
                    ..Default::default()
                },
                "max_depth",
            ),
            (
                ConfigUpdate {
                    top_k_paths: Some(0),
                    ..Default::default()
                },
                "top_k_paths",
            ),
        ] {
            let err = DriftConfig::default().apply(&update).unwrap_err();
            assert_eq!(err.field(), field);
        }
    }

    #[test]
    fn min_score_outside_unit_interval_is_rejected() {
        for bad in [-0.1, 1.5, f64::NAN] {
            let update = ConfigUpdate {
                min_path_score: Some(bad),
                ..Default::default()
            };
            let err = DriftConfig::default().apply(&update).unwrap_err();
            assert_eq!(err.field(), "min_path_score");
        }
    }

    #[test]
    fn failed_update_leaves_original_untouched() {
        let config = DriftConfig::default();
        let update = ConfigUpdate {
            max_depth: Some(7),
            top_k_paths: Some(0),
            ..Default::default()
        };
        assert!(config.apply(&update).is_err());
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn unknown_direction_and_strategy_strings_fail() {
        assert_eq!(
            "sideways".parse::<TraversalDirection>().unwrap_err(),
            ConfigError::UnknownDirection("sideways".to_string())
        );
        assert!("magic".parse::<InferenceStrategy>().is_err());
        assert_eq!(
            " Backward ".parse::<TraversalDirection>().unwrap(),
            TraversalDirection::Backward
        );

        let bad: Result<ConfigUpdate, _> =
            serde_json::from_str(r#"{"direction": "diagonal"}"#);
        assert!(bad.is_err());
        let good: ConfigUpdate =
            serde_json::from_str(r#"{"inference_strategy": "structural"}"#).unwrap();
        assert_eq!(good.inference_strategy, Some(InferenceStrategy::Structural));
    }

    #[test]
    fn env_lookup_overlays_defaults() {
        let vars: HashMap<&str, &str> = [
            ("DRIFT_MAX_DEPTH", "5"),
            ("DRIFT_DIRECTION", "forward"),
            ("DRIFT_ENABLE_INFERENCE", "false"),
        ]
        .into_iter()
        .collect();
        let config =
            DriftConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.direction, TraversalDirection::Forward);
        assert!(!config.enable_inference);
        assert_eq!(config.entry_point_count, 3);
    }

    #[test]
    fn env_lookup_reports_variable_name() {
        let err = DriftConfig::from_lookup(|k| {
            (k == "DRIFT_TOP_K_PATHS").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert_eq!(err.field(), "DRIFT_TOP_K_PATHS");

        let err =
            DriftConfig::from_lookup(|k| (k == "DRIFT_TOP_K_PATHS").then(|| "0".to_string()))
                .unwrap_err();
        assert_eq!(err.field(), "top_k_paths");
    }
}
