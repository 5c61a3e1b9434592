//! Token accounting and daily budget enforcement
//!
//! Every provider call records its token usage here. Prices are looked up
//! by longest model-name prefix so dated snapshots (`gpt-4o-2024-08-06`)
//! share the price of their family.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::config::CostConfig;
use crate::error::{Error, Result};

/// Token usage for a single LLM call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Cost of a single LLM call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCost {
    pub id: String,
    pub model: String,
    pub tokens: TokenUsage,
    pub input_cost_usd: f64,
    pub output_cost_usd: f64,
    pub timestamp: DateTime<Utc>,
    /// What the call was for (step id, "explain", ...)
    pub context: Option<String>,
}

impl LlmCost {
    pub fn total_cost_usd(&self) -> f64 {
        self.input_cost_usd + self.output_cost_usd
    }
}

/// Price of a model family, per million tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Model name or family prefix
    pub model: String,
    pub input_price_per_million: f64,
    pub output_price_per_million: f64,
}

impl ModelPricing {
    pub fn new(model: impl Into<String>, input_price: f64, output_price: f64) -> Self {
        Self {
            model: model.into(),
            input_price_per_million: input_price,
            output_price_per_million: output_price,
        }
    }

    /// Input and output cost in USD
    pub fn calculate_cost(&self, tokens: &TokenUsage) -> (f64, f64) {
        let input_cost = (tokens.input_tokens as f64 / 1_000_000.0) * self.input_price_per_million;
        let output_cost =
            (tokens.output_tokens as f64 / 1_000_000.0) * self.output_price_per_million;
        (input_cost, output_cost)
    }
}

/// Aggregated spend for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCostSummary {
    pub date: NaiveDate,
    pub total_cost_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub call_count: u32,
    pub by_model: HashMap<String, ModelCostSummary>,
}

impl DailyCostSummary {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            total_cost_usd: 0.0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            call_count: 0,
            by_model: HashMap::new(),
        }
    }

    pub fn add(&mut self, cost: &LlmCost) {
        self.total_cost_usd += cost.total_cost_usd();
        self.total_input_tokens += cost.tokens.input_tokens as u64;
        self.total_output_tokens += cost.tokens.output_tokens as u64;
        self.call_count += 1;

        self.by_model
            .entry(cost.model.clone())
            .or_insert_with(|| ModelCostSummary::new(cost.model.clone()))
            .add(cost);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCostSummary {
    pub model: String,
    pub total_cost_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub call_count: u32,
}

impl ModelCostSummary {
    pub fn new(model: String) -> Self {
        Self {
            model,
            total_cost_usd: 0.0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            call_count: 0,
        }
    }

    pub fn add(&mut self, cost: &LlmCost) {
        self.total_cost_usd += cost.total_cost_usd();
        self.total_input_tokens += cost.tokens.input_tokens as u64;
        self.total_output_tokens += cost.tokens.output_tokens as u64;
        self.call_count += 1;
    }
}

/// Published list prices (USD per million tokens)
fn default_pricing_table() -> HashMap<String, ModelPricing> {
    [
        // OpenAI
        ModelPricing::new("gpt-4o", 2.50, 10.0),
        ModelPricing::new("gpt-4o-mini", 0.15, 0.60),
        ModelPricing::new("gpt-4.1", 2.0, 8.0),
        ModelPricing::new("gpt-4.1-mini", 0.40, 1.60),
        ModelPricing::new("o3-mini", 1.10, 4.40),
        // Anthropic
        ModelPricing::new("claude-sonnet-4", 3.0, 15.0),
        ModelPricing::new("claude-opus-4", 15.0, 75.0),
        ModelPricing::new("claude-3-7-sonnet", 3.0, 15.0),
        ModelPricing::new("claude-3-5-sonnet", 3.0, 15.0),
        ModelPricing::new("claude-3-5-haiku", 0.80, 4.0),
    ]
    .into_iter()
    .map(|pricing| (pricing.model.clone(), pricing))
    .collect()
}

/// Records LLM spend and answers budget questions
///
/// Clones share the same records, so a tracker handed to a provider and one
/// kept by the CLI report the same totals.
#[derive(Debug, Clone)]
pub struct CostTracker {
    pricing: HashMap<String, ModelPricing>,
    /// Most recent first
    records: Arc<RwLock<Vec<LlmCost>>>,
    daily_summaries: Arc<RwLock<HashMap<NaiveDate, DailyCostSummary>>>,
    daily_limit_usd: f64,
    alert_threshold: f64,
}

impl CostTracker {
    pub fn new(daily_limit_usd: f64, alert_threshold: f64) -> Self {
        Self {
            pricing: default_pricing_table(),
            records: Arc::new(RwLock::new(Vec::new())),
            daily_summaries: Arc::new(RwLock::new(HashMap::new())),
            daily_limit_usd,
            alert_threshold,
        }
    }

    pub fn from_config(config: &CostConfig) -> Self {
        Self::new(config.daily_limit_usd, config.alert_threshold)
    }

    pub fn add_pricing(&mut self, pricing: ModelPricing) {
        self.pricing.insert(pricing.model.clone(), pricing);
    }

    /// Pricing for a model: exact name first, then the longest matching prefix
    pub fn get_pricing(&self, model: &str) -> Option<&ModelPricing> {
        if let Some(pricing) = self.pricing.get(model) {
            return Some(pricing);
        }
        self.pricing
            .values()
            .filter(|p| model.starts_with(p.model.as_str()))
            .max_by_key(|p| p.model.len())
    }

    /// Record a call; unknown models are recorded at zero cost
    pub fn record(&self, model: &str, tokens: TokenUsage, context: Option<String>) -> LlmCost {
        let (input_cost, output_cost) = match self.get_pricing(model) {
            Some(pricing) => pricing.calculate_cost(&tokens),
            None => {
                warn!(model = %model, "No pricing known for model, recording zero cost");
                (0.0, 0.0)
            }
        };

        let cost = LlmCost {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.to_string(),
            tokens,
            input_cost_usd: input_cost,
            output_cost_usd: output_cost,
            timestamp: Utc::now(),
            context,
        };

        if let Ok(mut records) = self.records.write() {
            records.insert(0, cost.clone());
        }

        let date = cost.timestamp.date_naive();
        if let Ok(mut summaries) = self.daily_summaries.write() {
            summaries
                .entry(date)
                .or_insert_with(|| DailyCostSummary::new(date))
                .add(&cost);
        }

        if self.is_approaching_limit() {
            warn!(
                spent = self.today_total(),
                limit = self.daily_limit_usd,
                "Approaching daily LLM budget"
            );
        }

        cost
    }

    pub fn today_total(&self) -> f64 {
        self.today_summary()
            .map(|summary| summary.total_cost_usd)
            .unwrap_or(0.0)
    }

    pub fn today_summary(&self) -> Option<DailyCostSummary> {
        self.summary_for_date(Utc::now().date_naive())
    }

    pub fn summary_for_date(&self, date: NaiveDate) -> Option<DailyCostSummary> {
        self.daily_summaries
            .read()
            .ok()
            .and_then(|s| s.get(&date).cloned())
    }

    pub fn is_approaching_limit(&self) -> bool {
        self.today_total() >= self.daily_limit_usd * self.alert_threshold
    }

    pub fn is_over_limit(&self) -> bool {
        self.today_total() >= self.daily_limit_usd
    }

    /// Fails with [`Error::BudgetExceeded`] once today's spend reaches the limit
    pub fn check_budget(&self) -> Result<()> {
        if self.is_over_limit() {
            let limit = self.daily_limit_usd;
            return Err(Error::BudgetExceeded(self.today_total(), limit, limit * 1.5));
        }
        Ok(())
    }

    pub fn remaining_budget(&self) -> f64 {
        (self.daily_limit_usd - self.today_total()).max(0.0)
    }

    pub fn daily_limit(&self) -> f64 {
        self.daily_limit_usd
    }

    pub fn records(&self) -> Vec<LlmCost> {
        self.records
            .read()
            .ok()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut records) = self.records.write() {
            records.clear();
        }
        if let Ok(mut summaries) = self.daily_summaries.write() {
            summaries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_model_pricing_calculation() {
        let pricing = ModelPricing::new("test-model", 3.0, 15.0);
        let (input_cost, output_cost) = pricing.calculate_cost(&TokenUsage::new(1_000_000, 500_000));

        assert!((input_cost - 3.0).abs() < 0.001);
        assert!((output_cost - 7.5).abs() < 0.001);
    }

    #[test]
    fn test_pricing_prefers_longest_prefix() {
        let tracker = CostTracker::new(10.0, 0.8);

        let mini = tracker.get_pricing("gpt-4o-mini-2024-07-18").unwrap();
        assert_eq!(mini.model, "gpt-4o-mini");

        let full = tracker.get_pricing("gpt-4o-2024-08-06").unwrap();
        assert_eq!(full.model, "gpt-4o");

        let sonnet = tracker.get_pricing("claude-sonnet-4-20250514").unwrap();
        assert_eq!(sonnet.input_price_per_million, 3.0);

        assert!(tracker.get_pricing("llama-3-70b").is_none());
    }

    #[test]
    fn test_record_and_today_total() {
        let tracker = CostTracker::new(10.0, 0.8);

        let cost = tracker.record(
            "claude-sonnet-4-20250514",
            TokenUsage::new(1_000_000, 0),
            Some("step-1".to_string()),
        );

        assert_eq!(cost.context.as_deref(), Some("step-1"));
        assert!((cost.total_cost_usd() - 3.0).abs() < 0.001);
        assert!((tracker.today_total() - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_budget_checks() {
        let tracker = CostTracker::new(1.0, 0.8);

        assert!(tracker.check_budget().is_ok());
        assert!((tracker.remaining_budget() - 1.0).abs() < 0.001);

        // $0.90 of $1.00
        tracker.record("claude-sonnet-4", TokenUsage::new(300_000, 0), None);
        assert!(tracker.is_approaching_limit());
        assert!(!tracker.is_over_limit());

        tracker.record("claude-sonnet-4", TokenUsage::new(100_000, 0), None);
        assert!(tracker.is_over_limit());
        match tracker.check_budget() {
            Err(Error::BudgetExceeded(spent, limit, suggested)) => {
                assert!(spent >= 1.0);
                assert_eq!(limit, 1.0);
                assert_eq!(suggested, 1.5);
            }
            other => panic!("expected budget error, got {:?}", other),
        }
    }

    #[test]
    fn test_daily_summary_by_model() {
        let tracker = CostTracker::new(10.0, 0.8);

        tracker.record("gpt-4o", TokenUsage::new(1000, 500), None);
        tracker.record("gpt-4o-mini", TokenUsage::new(2000, 1000), None);
        tracker.record("gpt-4o-mini", TokenUsage::new(10, 10), None);

        let summary = tracker.today_summary().unwrap();
        assert_eq!(summary.call_count, 3);
        assert_eq!(summary.total_input_tokens, 3010);
        assert_eq!(summary.by_model.len(), 2);
        assert_eq!(summary.by_model["gpt-4o-mini"].call_count, 2);
    }

    #[test]
    fn test_unknown_model_is_free() {
        let tracker = CostTracker::new(10.0, 0.8);
        let cost = tracker.record("local/model", TokenUsage::new(1000, 500), None);
        assert_eq!(cost.total_cost_usd(), 0.0);
    }

    #[test]
    fn test_custom_pricing() {
        let mut tracker = CostTracker::new(10.0, 0.8);
        tracker.add_pricing(ModelPricing::new("local/model", 1.0, 2.0));

        let cost = tracker.record("local/model", TokenUsage::new(1_000_000, 500_000), None);
        assert!((cost.total_cost_usd() - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_clones_share_records() {
        let tracker = CostTracker::new(10.0, 0.8);
        let shared = tracker.clone();

        shared.record("gpt-4o", TokenUsage::new(10, 10), None);
        assert_eq!(tracker.records().len(), 1);

        tracker.clear();
        assert!(shared.records().is_empty());
        assert!(shared.today_summary().is_none());
    }
}
