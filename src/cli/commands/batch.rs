//! `enhance batch <dir>` - enhance every matching document under a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use crate::batch::BatchExecutor;
use crate::cache::ResultCache;
use crate::config::ConfigLoader;
use crate::cost::CostModel;
use crate::document::Document;
use crate::history::VersionHistory;
use crate::llm::{ProviderConfig, create_provider};
use crate::pipeline::Coordinator;
use crate::quality;
use crate::report::{ImprovementReport, MetricsCollector};
use crate::strategy::StrategyRegistry;

pub struct BatchArgs {
    pub dir: PathBuf,
    pub pattern: String,
    pub recursive: bool,
    pub strategies: Vec<String>,
    pub parallel: Option<usize>,
    pub report: Option<PathBuf>,
}

/// Translate a `*`/`**` glob into an anchored regex. `**` matches across
/// path separators, a bare `*` stops at one; `?` matches a single character.
fn glob_to_regex(pattern: &str) -> Regex {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if chars.peek() == Some(&'/') {
                    chars.next();
                }
                out.push_str("(?:.*/)?");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '.' | '+' | '(' | ')' | '[' | ']' | '{' | '}' | '^' | '$' | '|' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("$^").expect("empty-match fallback regex is valid"))
}

fn collect_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, out)?;
            }
        } else {
            out.push(path);
        }
    }
    Ok(())
}

pub async fn run(args: BatchArgs) -> anyhow::Result<bool> {
    let mut settings = ConfigLoader::load()?;
    if !args.strategies.is_empty() {
        for (name, config) in settings.strategies.iter_mut() {
            config.enabled = args.strategies.iter().any(|s| s == name);
        }
    }
    if let Some(parallel) = args.parallel {
        settings.pipeline.max_parallel_docs = parallel as u32;
    }

    let mut candidates = Vec::new();
    collect_files(&args.dir, args.recursive, &mut candidates)?;

    let matcher = glob_to_regex(&args.pattern);
    let matched: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| {
            let relative = path.strip_prefix(&args.dir).unwrap_or(path);
            matcher.is_match(&relative.to_string_lossy())
        })
        .collect();

    if matched.is_empty() {
        println!("No documents matched pattern '{}' under {}", args.pattern, args.dir.display());
        return Ok(true);
    }

    let documents: Vec<Document> = matched
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path).unwrap_or_default();
            Document::new(content).with_metadata("path", serde_json::json!(path.display().to_string()))
        })
        .collect();

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

    let coordinator = Arc::new(Coordinator::new(
        &settings,
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
    ));

    let executor = BatchExecutor::new(coordinator, settings.pipeline.max_parallel_docs as usize);
    let results = executor.enhance_batch(&documents).await;

    let metrics = MetricsCollector::new();
    let mut reports = Vec::with_capacity(results.len());
    for (path, result) in matched.iter().zip(results.iter()) {
        let significant = result.improvement_percentage >= settings.pipeline.improvement_threshold * 100.0;
        metrics.record_result(result, significant, settings.pipeline.improvement_threshold);

        let initial = quality::score(&result.original_content);
        let r#final = quality::score(&result.enhanced_content);
        reports.push(ImprovementReport::build(
            path.display().to_string(),
            initial,
            r#final,
            result,
            settings.pipeline.quality_threshold,
            settings.pipeline.improvement_threshold,
        ));

        if result.success {
            std::fs::write(path, &result.enhanced_content)?;
        }
    }

    println!("{}", metrics.display());

    if let Some(report_path) = &args.report {
        std::fs::write(report_path, serde_json::to_string_pretty(&reports)?)?;
    }

    Ok(results.iter().all(|r| r.success))
}
