//! Mode Profiles
//!
//! A [`Mode`] is a pure function to a tuned default [`PipelineConfig`] plus
//! an LLM temperature. Field-by-field overrides from the loaded config are
//! applied on top of the profile - see [`super::settings::Settings::from_mode`].

use serde::{Deserialize, Serialize};

use super::settings::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Basic,
    #[default]
    Performance,
    Secure,
    Enterprise,
}

/// Cache behavior isn't a single on/off switch once providers other than
/// "off" exist - Secure isolates entries per caller, Enterprise runs both
/// semantic and isolated caching. The coordinator only reads `enabled`
/// today; `isolation` is carried through for a future multi-tenant cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheIsolation {
    Semantic,
    Isolated,
    Both,
}

pub struct ModeProfile {
    pub pipeline: PipelineConfig,
    pub temperature: f32,
    pub llm_synthesis: bool,
    pub rate_limit_per_minute: u32,
    pub cache_isolation: Option<CacheIsolation>,
}

impl Mode {
    pub fn profile(self) -> ModeProfile {
        match self {
            Mode::Basic => ModeProfile {
                pipeline: PipelineConfig {
                    max_passes: 2,
                    batch_size: 3,
                    max_parallel_docs: 1,
                    max_cost_per_document: 0.10,
                    cache_enabled: false,
                    ..PipelineConfig::bare_defaults()
                },
                temperature: 0.8,
                llm_synthesis: false,
                rate_limit_per_minute: 15,
                cache_isolation: None,
            },
            Mode::Performance => ModeProfile {
                pipeline: PipelineConfig {
                    max_passes: 3,
                    batch_size: 20,
                    max_parallel_docs: 15,
                    max_cost_per_document: 0.30,
                    cache_enabled: true,
                    ..PipelineConfig::bare_defaults()
                },
                temperature: 0.7,
                llm_synthesis: false,
                rate_limit_per_minute: 120,
                cache_isolation: Some(CacheIsolation::Semantic),
            },
            Mode::Secure => ModeProfile {
                pipeline: PipelineConfig {
                    max_passes: 3,
                    batch_size: 10,
                    max_parallel_docs: 8,
                    max_cost_per_document: 0.40,
                    cache_enabled: true,
                    ..PipelineConfig::bare_defaults()
                },
                temperature: 0.7,
                llm_synthesis: false,
                rate_limit_per_minute: 60,
                cache_isolation: Some(CacheIsolation::Isolated),
            },
            Mode::Enterprise => ModeProfile {
                pipeline: PipelineConfig {
                    max_passes: 5,
                    batch_size: 25,
                    max_parallel_docs: 25,
                    max_cost_per_document: 1.00,
                    cache_enabled: true,
                    ..PipelineConfig::bare_defaults()
                },
                temperature: 0.5,
                llm_synthesis: true,
                rate_limit_per_minute: 200,
                cache_isolation: Some(CacheIsolation::Both),
            },
        }
    }

    pub fn parallel(self) -> bool {
        !matches!(self, Mode::Basic)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Basic => "basic",
            Mode::Performance => "performance",
            Mode::Secure => "secure",
            Mode::Enterprise => "enterprise",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_profile_matches_table() {
        let profile = Mode::Basic.profile();
        assert_eq!(profile.pipeline.max_passes, 2);
        assert_eq!(profile.pipeline.batch_size, 3);
        assert_eq!(profile.pipeline.max_parallel_docs, 1);
        assert!((profile.pipeline.max_cost_per_document - 0.10).abs() < 1e-9);
        assert!(!profile.pipeline.cache_enabled);
        assert_eq!(profile.rate_limit_per_minute, 15);
        assert!(!profile.llm_synthesis);
        assert!((profile.temperature - 0.8).abs() < 1e-9);
    }

    #[test]
    fn enterprise_profile_enables_synthesis_and_both_caches() {
        let profile = Mode::Enterprise.profile();
        assert_eq!(profile.pipeline.max_passes, 5);
        assert!(profile.llm_synthesis);
        assert_eq!(profile.cache_isolation, Some(CacheIsolation::Both));
    }

    #[test]
    fn basic_mode_is_not_parallel() {
        assert!(!Mode::Basic.parallel());
        assert!(Mode::Performance.parallel());
    }
}
