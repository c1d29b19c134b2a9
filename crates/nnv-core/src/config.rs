//! HNSW index configuration.
//!
//! [`HnswOptions`] carries user overrides (from code, a TOML file or the
//! environment); [`HnswOptions::build`] resolves derived defaults and
//! validates them into an immutable [`HnswConfig`].

use std::fmt;
use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable prefix for index options (`NNV_HNSW_EF=64`).
pub const ENV_PREFIX: &str = "NNV_HNSW_";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A parameter is out of range.
    #[error("{field}: {reason}")]
    Invalid {
        /// Offending option name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Figment failed to extract options.
    #[error("failed to load options: {0}")]
    Load(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Neighbor selection policy used during insertion, pruning and search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchAlgorithm {
    /// Keep the `k` closest candidates.
    #[default]
    Simple,
    /// Diversity-aware selection from the HNSW paper.
    Heuristic,
}

impl SearchAlgorithm {
    /// Stable tag used by the snapshot codec.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Simple => 0,
            Self::Heuristic => 1,
        }
    }

    /// Inverse of [`SearchAlgorithm::tag`].
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Simple),
            1 => Some(Self::Heuristic),
            _ => None,
        }
    }
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("simple"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// User-facing index options. Unset values are derived in [`HnswOptions::build`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnswOptions {
    /// Neighbor selection policy.
    pub search_algorithm: SearchAlgorithm,
    /// Search beam width.
    pub ef: usize,
    /// Construction beam width.
    pub ef_construction: usize,
    /// Neighbors selected per inserted vertex and level.
    pub m: usize,
    /// Degree cap for levels >= 1 (default `m`).
    pub m_max: Option<usize>,
    /// Degree cap for level 0 (default `2 * m`).
    pub m_max0: Option<usize>,
    /// Level draw multiplier (default `1 / ln(m)`).
    pub level_multiplier: Option<f32>,
    /// Heuristic: also consider the candidates' own neighbors.
    pub heuristic_extend_candidates: bool,
    /// Heuristic: backfill with rejected candidates up to `k`.
    pub heuristic_keep_pruned: bool,
}

impl Default for HnswOptions {
    fn default() -> Self {
        Self {
            search_algorithm: SearchAlgorithm::Simple,
            ef: 20,
            ef_construction: 200,
            m: 16,
            m_max: None,
            m_max0: None,
            level_multiplier: None,
            heuristic_extend_candidates: false,
            heuristic_keep_pruned: true,
        }
    }
}

impl HnswOptions {
    /// Loads options from defaults, an optional TOML file, then `NNV_HNSW_*` variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a source cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)).extract()?)
    }

    /// Sets the neighbor selection policy.
    #[must_use]
    pub fn with_search_algorithm(mut self, algorithm: SearchAlgorithm) -> Self {
        self.search_algorithm = algorithm;
        self
    }

    /// Sets the search beam width.
    #[must_use]
    pub fn with_ef(mut self, ef: usize) -> Self {
        self.ef = ef;
        self
    }

    /// Sets the construction beam width.
    #[must_use]
    pub fn with_ef_construction(mut self, ef_construction: usize) -> Self {
        self.ef_construction = ef_construction;
        self
    }

    /// Sets the base degree.
    #[must_use]
    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    /// Sets the degree cap for upper levels.
    #[must_use]
    pub fn with_m_max(mut self, m_max: usize) -> Self {
        self.m_max = Some(m_max);
        self
    }

    /// Sets the degree cap for level 0.
    #[must_use]
    pub fn with_m_max0(mut self, m_max0: usize) -> Self {
        self.m_max0 = Some(m_max0);
        self
    }

    /// Sets the level draw multiplier.
    #[must_use]
    pub fn with_level_multiplier(mut self, level_multiplier: f32) -> Self {
        self.level_multiplier = Some(level_multiplier);
        self
    }

    /// Enables or disables candidate extension for the heuristic policy.
    #[must_use]
    pub fn with_heuristic_extend_candidates(mut self, extend: bool) -> Self {
        self.heuristic_extend_candidates = extend;
        self
    }

    /// Enables or disables pruned-candidate backfill for the heuristic policy.
    #[must_use]
    pub fn with_heuristic_keep_pruned(mut self, keep: bool) -> Self {
        self.heuristic_keep_pruned = keep;
        self
    }

    /// Resolves derived values and validates the result.
    // SAFETY: m is bounded by validation before the f32 conversion; precision loss is irrelevant
    // for a logarithm used as a level multiplier.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(self) -> Result<HnswConfig, ConfigError> {
        if self.m < 2 {
            return Err(invalid("m", format!("must be at least 2, got {}", self.m)));
        }
        if self.ef == 0 {
            return Err(invalid("ef", "must be at least 1".to_string()));
        }
        if self.ef_construction == 0 {
            return Err(invalid("ef_construction", "must be at least 1".to_string()));
        }

        let m_max = self.m_max.unwrap_or(self.m);
        let m_max0 = match self.m_max0 {
            Some(m_max0) => m_max0,
            None => self.m.checked_mul(2).ok_or_else(|| {
                invalid("m", format!("too large to derive m_max0, got {}", self.m))
            })?,
        };
        if m_max < self.m {
            return Err(invalid(
                "m_max",
                format!("must be >= m ({}), got {m_max}", self.m),
            ));
        }
        if m_max0 < self.m {
            return Err(invalid(
                "m_max0",
                format!("must be >= m ({}), got {m_max0}", self.m),
            ));
        }

        let level_multiplier = self
            .level_multiplier
            .unwrap_or_else(|| 1.0 / (self.m as f32).ln());
        if !level_multiplier.is_finite() || level_multiplier <= 0.0 {
            return Err(invalid(
                "level_multiplier",
                format!("must be finite and positive, got {level_multiplier}"),
            ));
        }

        Ok(HnswConfig {
            search_algorithm: self.search_algorithm,
            level_multiplier,
            ef: self.ef,
            ef_construction: self.ef_construction,
            m: self.m,
            m_max,
            m_max0,
            heuristic_extend_candidates: self.heuristic_extend_candidates,
            heuristic_keep_pruned: self.heuristic_keep_pruned,
        })
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Resolved, validated and immutable index configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HnswConfig {
    search_algorithm: SearchAlgorithm,
    level_multiplier: f32,
    ef: usize,
    ef_construction: usize,
    m: usize,
    m_max: usize,
    m_max0: usize,
    heuristic_extend_candidates: bool,
    heuristic_keep_pruned: bool,
}

impl Default for HnswConfig {
    fn default() -> Self {
        let defaults = HnswOptions::default();
        Self {
            search_algorithm: defaults.search_algorithm,
            level_multiplier: 1.0 / 16.0_f32.ln(),
            ef: defaults.ef,
            ef_construction: defaults.ef_construction,
            m: defaults.m,
            m_max: defaults.m,
            m_max0: 2 * defaults.m,
            heuristic_extend_candidates: defaults.heuristic_extend_candidates,
            heuristic_keep_pruned: defaults.heuristic_keep_pruned,
        }
    }
}

impl HnswConfig {
    /// Neighbor selection policy.
    #[must_use]
    pub fn search_algorithm(&self) -> SearchAlgorithm {
        self.search_algorithm
    }

    /// Level draw multiplier.
    #[must_use]
    pub fn level_multiplier(&self) -> f32 {
        self.level_multiplier
    }

    /// Search beam width.
    #[must_use]
    pub fn ef(&self) -> usize {
        self.ef
    }

    /// Construction beam width.
    #[must_use]
    pub fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Neighbors selected per inserted vertex and level.
    #[must_use]
    pub fn m(&self) -> usize {
        self.m
    }

    /// Degree cap for levels >= 1.
    #[must_use]
    pub fn m_max(&self) -> usize {
        self.m_max
    }

    /// Degree cap for level 0.
    #[must_use]
    pub fn m_max0(&self) -> usize {
        self.m_max0
    }

    /// Degree cap for the given level.
    #[must_use]
    pub fn max_degree(&self, level: usize) -> usize {
        if level == 0 {
            self.m_max0
        } else {
            self.m_max
        }
    }

    /// Whether the heuristic extends candidates with their neighbors.
    #[must_use]
    pub fn heuristic_extend_candidates(&self) -> bool {
        self.heuristic_extend_candidates
    }

    /// Whether the heuristic backfills rejected candidates.
    #[must_use]
    pub fn heuristic_keep_pruned(&self) -> bool {
        self.heuristic_keep_pruned
    }

    /// Returns fully specified options that rebuild this configuration.
    #[must_use]
    pub fn to_options(&self) -> HnswOptions {
        HnswOptions {
            search_algorithm: self.search_algorithm,
            ef: self.ef,
            ef_construction: self.ef_construction,
            m: self.m,
            m_max: Some(self.m_max),
            m_max0: Some(self.m_max0),
            level_multiplier: Some(self.level_multiplier),
            heuristic_extend_candidates: self.heuristic_extend_candidates,
            heuristic_keep_pruned: self.heuristic_keep_pruned,
        }
    }
}

impl fmt::Display for HnswConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "searchAlgorithm: {}, ef: {}, efConstruction: {}, m: {}, mMax: {}, mMax0: {}, levelMultiplier: {:.4}, extendCandidates: {}, keepPruned: {}",
            self.search_algorithm,
            self.ef,
            self.ef_construction,
            self.m,
            self.m_max,
            self.m_max0,
            self.level_multiplier,
            self.heuristic_extend_candidates,
            self.heuristic_keep_pruned,
        )
    }
}
