//! `enhance document <path>` - enhance a single file in place.

use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::{ConfigLoader, Mode, Settings};
use crate::cost::CostModel;
use crate::document::Document;
use crate::history::VersionHistory;
use crate::llm::{ProviderConfig, create_provider};
use crate::pipeline::Coordinator;
use crate::quality;
use crate::report::ImprovementReport;
use crate::strategy::StrategyRegistry;

pub struct DocumentArgs {
    pub path: PathBuf,
    pub strategies: Vec<String>,
    pub max_passes: Option<u32>,
    pub quality_threshold: Option<f64>,
    pub mode: Option<Mode>,
    pub output: Option<PathBuf>,
    pub backup: bool,
    pub dry_run: bool,
}

fn load_settings(args: &DocumentArgs) -> anyhow::Result<Settings> {
    let mut settings = match args.mode {
        Some(mode) => ConfigLoader::load_with_mode(mode)?,
        None => ConfigLoader::load()?,
    };

    if let Some(max_passes) = args.max_passes {
        settings.pipeline.max_passes = max_passes;
    }
    if let Some(threshold) = args.quality_threshold {
        settings.pipeline.quality_threshold = threshold;
    }
    if !args.strategies.is_empty() {
        for (name, config) in settings.strategies.iter_mut() {
            config.enabled = args.strategies.iter().any(|s| s == name);
        }
    }

    Ok(settings)
}

fn build_coordinator(settings: &Settings) -> Coordinator {
    let llm = create_provider(&ProviderConfig {
        provider: settings.llm.primary.clone(),
        temperature: settings.llm.temperature,
        max_tokens: settings.llm.max_tokens,
        ..ProviderConfig::default()
    })
    .ok();

    let cache = if settings.pipeline.cache_enabled {
        Some(Arc::new(ResultCache::new(settings.pipeline.cache_size, settings.pipeline.cache_ttl)))
    } else {
        None
    };

    Coordinator::new(
        settings,
        Arc::new(StrategyRegistry::with_defaults()),
        VersionHistory::new(crate::config::MAX_VERSIONS_PER_DOCUMENT),
        Arc::new(CostModel::new(
            settings.pipeline.daily_budget,
            settings.pipeline.monthly_budget,
            settings.pipeline.max_cost_per_document,
            false,
        )),
        cache,
        llm,
    )
}

pub async fn run(args: DocumentArgs) -> anyhow::Result<bool> {
    let settings = load_settings(&args)?;
    let content = std::fs::read_to_string(&args.path)?;
    let document = Document::new(content.clone()).with_metadata("path", serde_json::json!(args.path.display().to_string()));

    let coordinator = build_coordinator(&settings);
    let result = coordinator.enhance(&document).await?;

    let report = ImprovementReport::build(
        args.path.display().to_string(),
        quality::score(&content),
        quality::score(&result.enhanced_content),
        &result,
        settings.pipeline.quality_threshold,
        settings.pipeline.improvement_threshold,
    );
    println!("{}", report.generate_summary());

    if args.dry_run {
        return Ok(result.success);
    }

    if let Some(output) = &args.output {
        std::fs::write(output, &result.enhanced_content)?;
    } else {
        if args.backup {
            std::fs::write(args.path.with_extension("bak"), &content)?;
        }
        std::fs::write(&args.path, &result.enhanced_content)?;
    }

    Ok(result.success)
}
