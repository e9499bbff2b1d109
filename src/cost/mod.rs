//! Cost Model & Budget Guard
//!
//! Tracks tokens/calls/cost per provider and per strategy, enforces
//! per-document/daily/monthly budgets, and recommends optimizations.
//!
//! Global totals are compare-exchange loops over atomics, never a blocking
//! mutex around the whole structure. Cost is stored as microdollars
//! (`f64 * 1_000_000` truncated to `u64`) so it can live in an `AtomicU64`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Utc};

use crate::constants::budget as budget_constants;
use crate::error::{EnhanceError, Result};
use crate::strategy::StrategyKind;

const MICROS_PER_DOLLAR: f64 = 1_000_000.0;

fn to_micros(usd: f64) -> u64 {
    (usd.max(0.0) * MICROS_PER_DOLLAR) as u64
}

fn from_micros(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_DOLLAR
}

// =============================================================================
// Pricing
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Static pricing table keyed by (provider, model). Unknown pairs fall back
/// to a conservative estimate rather than erroring.
pub fn lookup_pricing(provider: &str, model: &str) -> ModelPricing {
    match (provider, model) {
        ("local", _) => ModelPricing {
            input_per_1k: 0.0,
            output_per_1k: 0.0,
        },
        ("remote", "gpt-4-turbo-preview") => ModelPricing {
            input_per_1k: 0.01,
            output_per_1k: 0.03,
        },
        ("remote", "gpt-4o-mini") => ModelPricing {
            input_per_1k: 0.00015,
            output_per_1k: 0.0006,
        },
        _ => ModelPricing {
            input_per_1k: budget_constants::FALLBACK_INPUT_PRICE_PER_1K,
            output_per_1k: budget_constants::FALLBACK_OUTPUT_PRICE_PER_1K,
        },
    }
}

/// Per-strategy cost multiplier: strategies that synthesize more text cost more.
pub fn strategy_multiplier(strategy: StrategyKind) -> f64 {
    match strategy {
        StrategyKind::Clarity => 1.0,
        StrategyKind::Completeness => 1.5,
        StrategyKind::Consistency => 0.8,
        StrategyKind::Accuracy => 1.2,
        StrategyKind::Readability => 0.9,
        // `All` is a sentinel that expands to the five concrete strategies
        // before reaching per-strategy cost code (see StrategyKind::all());
        // it is never passed here directly.
        StrategyKind::All => unreachable!("StrategyKind::All is expanded before cost lookup"),
    }
}

/// `tokens ~= chars/4`; apply the strategy multiplier and, if enabled, the
/// cost-optimization discount.
pub fn estimate(
    content_length: usize,
    strategy: Option<StrategyKind>,
    provider: &str,
    model: &str,
    cost_optimization: bool,
) -> f64 {
    let pricing = lookup_pricing(provider, model);
    let tokens = content_length as f64 / budget_constants::CHARS_PER_TOKEN;
    let base = (tokens / 1000.0) * (pricing.input_per_1k + pricing.output_per_1k);
    let with_strategy = base * strategy.map(strategy_multiplier).unwrap_or(1.0);
    if cost_optimization {
        with_strategy * budget_constants::COST_OPTIMIZATION_FACTOR
    } else {
        with_strategy
    }
}

// =============================================================================
// Cost Records
// =============================================================================

/// Running totals for a single (provider, model, strategy) triple.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CostRecord {
    pub cost_usd: f64,
    pub tokens: u64,
    pub calls: u64,
}

/// One hour's worth of spend, for rolling averages / off-peak analysis.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HourlyCost {
    pub hour_start: DateTime<Utc>,
    pub cost_usd: f64,
}

// =============================================================================
// Budget Guard
// =============================================================================

/// Thread-safe, lock-free-on-the-hot-path budget tracker.
pub struct CostModel {
    daily_budget: f64,
    monthly_budget: f64,
    per_document_limit: f64,
    cost_optimization: bool,

    daily_spent_micros: AtomicU64,
    monthly_spent_micros: AtomicU64,
    daily_reset_day: AtomicU64,
    monthly_reset_month: AtomicU64,

    records: RwLock<HashMap<(String, String, String), CostRecord>>,
    hourly_ledger: RwLock<Vec<HourlyCost>>,
}

impl CostModel {
    pub fn new(daily_budget: f64, monthly_budget: f64, per_document_limit: f64, cost_optimization: bool) -> Self {
        let now = Utc::now();
        Self {
            daily_budget,
            monthly_budget,
            per_document_limit,
            cost_optimization,
            daily_spent_micros: AtomicU64::new(0),
            monthly_spent_micros: AtomicU64::new(0),
            daily_reset_day: AtomicU64::new(now.ordinal0() as u64),
            monthly_reset_month: AtomicU64::new(now.month0() as u64),
            records: RwLock::new(HashMap::new()),
            hourly_ledger: RwLock::new(Vec::new()),
        }
    }

    pub fn estimate(&self, content_length: usize, strategy: Option<StrategyKind>, provider: &str, model: &str) -> f64 {
        estimate(content_length, strategy, provider, model, self.cost_optimization)
    }

    fn roll_windows_if_needed(&self) {
        let now = Utc::now();
        let day = now.ordinal0() as u64;
        let month = now.month0() as u64;

        if self.daily_reset_day.swap(day, Ordering::AcqRel) != day {
            self.daily_spent_micros.store(0, Ordering::Release);
        }
        if self.monthly_reset_month.swap(month, Ordering::AcqRel) != month {
            self.monthly_spent_micros.store(0, Ordering::Release);
        }
    }

    /// `false` if any of daily/monthly/per-document limits would be breached.
    pub fn may_spend(&self, estimate: f64) -> bool {
        self.roll_windows_if_needed();

        if estimate > self.per_document_limit {
            return false;
        }

        let daily = from_micros(self.daily_spent_micros.load(Ordering::Acquire));
        if daily + estimate > self.daily_budget {
            return false;
        }

        let monthly = from_micros(self.monthly_spent_micros.load(Ordering::Acquire));
        if monthly + estimate > self.monthly_budget {
            return false;
        }

        true
    }

    /// Record actual spend. Always succeeds - the gate is `may_spend`, called
    /// before the strategy runs; `record` just makes the spend durable.
    pub fn record(&self, cost: f64, tokens: u64, provider: &str, model: &str, strategy: StrategyKind) {
        self.roll_windows_if_needed();

        let micros = to_micros(cost);
        cas_add(&self.daily_spent_micros, micros);
        cas_add(&self.monthly_spent_micros, micros);

        let key = (provider.to_string(), model.to_string(), strategy.as_str().to_string());
        let mut records = self
            .records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = records.entry(key).or_default();
        entry.cost_usd += cost;
        entry.tokens += tokens;
        entry.calls += 1;
        drop(records);

        let hour_start = Utc::now()
            .date_naive()
            .and_hms_opt(Utc::now().hour(), 0, 0)
            .and_then(|naive| naive.and_local_timezone(Utc).single())
            .unwrap_or_else(Utc::now);

        let mut ledger = self
            .hourly_ledger
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(last) = ledger.last_mut() {
            if last.hour_start == hour_start {
                last.cost_usd += cost;
                return;
            }
        }
        ledger.push(HourlyCost { hour_start, cost_usd: cost });
    }

    /// Return an error if `estimate` would exceed budget without recording anything.
    pub fn guard(&self, estimate: f64, scope: &str) -> Result<()> {
        if self.may_spend(estimate) {
            return Ok(());
        }

        let (spent, limit) = if estimate > self.per_document_limit {
            (estimate, self.per_document_limit)
        } else {
            let daily = from_micros(self.daily_spent_micros.load(Ordering::Acquire));
            if daily + estimate > self.daily_budget {
                (daily, self.daily_budget)
            } else {
                (
                    from_micros(self.monthly_spent_micros.load(Ordering::Acquire)),
                    self.monthly_budget,
                )
            }
        };

        Err(EnhanceError::BudgetExceeded {
            scope: scope.to_string(),
            requested: estimate,
            spent,
            limit,
        })
    }

    pub fn daily_spent(&self) -> f64 {
        from_micros(self.daily_spent_micros.load(Ordering::Acquire))
    }

    pub fn monthly_spent(&self) -> f64 {
        from_micros(self.monthly_spent_micros.load(Ordering::Acquire))
    }

    pub fn records_snapshot(&self) -> HashMap<(String, String, String), CostRecord> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Simulate cost reductions from cheaper models, dropping non-essential
    /// strategies, batching, and caching. Multipliers compose multiplicatively.
    pub fn recommend(
        &self,
        content_length: usize,
        strategies: &[StrategyKind],
        quality_threshold: f64,
        provider: &str,
        model: &str,
        cache_enabled: bool,
        large_batch: bool,
    ) -> CostRecommendation {
        let original_cost: f64 = strategies
            .iter()
            .map(|s| self.estimate(content_length, Some(*s), provider, model))
            .sum();

        let mut rationale = Vec::new();
        let mut multiplier = 1.0;

        if quality_threshold < 0.7 {
            multiplier *= 0.6;
            rationale.push("quality threshold below 0.7: recommend a cheaper model".to_string());
        }

        let essential: Vec<StrategyKind> = if quality_threshold >= 0.9 {
            strategies.to_vec()
        } else if quality_threshold >= 0.8 {
            strategies
                .iter()
                .copied()
                .filter(|s| *s != StrategyKind::Consistency)
                .collect()
        } else {
            strategies
                .iter()
                .copied()
                .filter(|s| matches!(s, StrategyKind::Clarity | StrategyKind::Readability))
                .collect()
        };

        if essential.len() < strategies.len() {
            rationale.push(format!(
                "dropping {} non-essential strategies for threshold {:.2}",
                strategies.len() - essential.len(),
                quality_threshold
            ));
            multiplier *= essential.len().max(1) as f64 / strategies.len().max(1) as f64;
        }

        if large_batch {
            multiplier *= 0.85;
            rationale.push("batching large content: 0.85x".to_string());
        }

        if cache_enabled {
            multiplier *= 0.9;
            rationale.push("caching enabled: 0.9x".to_string());
        }

        CostRecommendation {
            original_cost,
            optimized_cost: original_cost * multiplier,
            rationale,
        }
    }
}

fn cas_add(counter: &AtomicU64, amount: u64) {
    loop {
        let current = counter.load(Ordering::Acquire);
        let next = current + amount;
        if counter
            .compare_exchange_weak(current, next, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }
    }
}

use chrono::Timelike;

#[derive(Debug, Clone, serde::Serialize)]
pub struct CostRecommendation {
    pub original_cost: f64,
    pub optimized_cost: f64,
    pub rationale: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_multiplier() {
        let clarity = estimate(4000, Some(StrategyKind::Clarity), "remote", "gpt-4-turbo-preview", false);
        let completeness = estimate(4000, Some(StrategyKind::Completeness), "remote", "gpt-4-turbo-preview", false);
        assert!(completeness > clarity);
    }

    #[test]
    fn local_provider_is_free() {
        assert_eq!(estimate(10_000, None, "local", "local-echo", false), 0.0);
    }

    #[test]
    fn may_spend_respects_per_document_limit() {
        let model = CostModel::new(100.0, 1000.0, 0.05, false);
        assert!(model.may_spend(0.04));
        assert!(!model.may_spend(0.06));
    }

    #[test]
    fn record_accumulates_daily_spend() {
        let model = CostModel::new(1.0, 100.0, 1.0, false);
        model.record(0.4, 1000, "remote", "gpt-4o-mini", StrategyKind::Clarity);
        assert!((model.daily_spent() - 0.4).abs() < 1e-9);
        assert!(!model.may_spend(0.7));
    }

    #[test]
    fn guard_reports_scope() {
        let model = CostModel::new(100.0, 1000.0, 0.05, false);
        let err = model.guard(0.06, "per_document").unwrap_err();
        assert_eq!(err.tag(), "budget:per_document");
    }

    #[test]
    fn recommend_drops_consistency_below_0_9() {
        let model = CostModel::new(100.0, 1000.0, 1.0, false);
        let strategies = StrategyKind::all();
        let rec = model.recommend(4000, &strategies, 0.85, "remote", "gpt-4o-mini", false, false);
        assert!(rec.optimized_cost < rec.original_cost);
        assert!(!rec.rationale.is_empty());
    }
}
