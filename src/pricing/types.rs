use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::round_usd;
use crate::error::PricingError;

/// How reasoning tokens are billed for a model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum ReasoningBilling {
    /// Reasoning tokens are already counted in the output tokens
    #[default]
    IncludedInOutput,
    /// Reasoning tokens are billed at their own rate, on top of output
    Separate,
}

/// Model pricing info (USD per million tokens)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelPricing {
    pub(crate) input_per_million: f64,
    pub(crate) output_per_million: f64,
    #[serde(default)]
    pub(crate) cache_read_per_million: Option<f64>,
    #[serde(default)]
    pub(crate) cache_write_per_million: Option<f64>,
    #[serde(default)]
    pub(crate) reasoning_per_million: Option<f64>,
    #[serde(default)]
    pub(crate) reasoning_billing: ReasoningBilling,
}

impl ModelPricing {
    fn is_valid(&self) -> bool {
        let ok = |rate: f64| rate.is_finite() && rate >= 0.0;
        ok(self.input_per_million)
            && ok(self.output_per_million)
            && [
                self.cache_read_per_million,
                self.cache_write_per_million,
                self.reasoning_per_million,
            ]
            .into_iter()
            .flatten()
            .all(ok)
    }
}

/// Where the rate table of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum PricingOrigin {
    /// Fresh cache for the configured URL
    Cache,
    /// Cache of any age, offline mode
    OfflineCache,
    Network,
    /// Network failed; an expired cache was used instead
    StaleCache,
}

/// On-disk pricing cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PricingCachePayload {
    pub(crate) fetched_at: DateTime<Utc>,
    pub(crate) source_url: String,
    pub(crate) pricing_by_model: HashMap<String, ModelPricing>,
}

impl PricingCachePayload {
    /// Drop entries with unusable rates; `None` when nothing is left.
    pub(crate) fn validated(mut self) -> Option<Self> {
        self.pricing_by_model.retain(|_, p| p.is_valid());
        (!self.pricing_by_model.is_empty()).then_some(self)
    }
}

/// One rate-table entry as published upstream (USD per token)
#[derive(Debug, Deserialize)]
struct RawRateEntry {
    input_cost_per_token: Option<f64>,
    output_cost_per_token: Option<f64>,
    input_cost_per_token_priority: Option<f64>,
    output_cost_per_token_priority: Option<f64>,
    cache_read_input_token_cost: Option<f64>,
    cache_creation_input_token_cost: Option<f64>,
    #[serde(alias = "reasoning_output_cost_per_token", alias = "reasoning_cost_per_token")]
    output_cost_per_reasoning_token: Option<f64>,
}

fn per_million(rate: Option<f64>) -> Option<f64> {
    rate.filter(|r| r.is_finite() && *r >= 0.0)
        .map(|r| round_usd(r * 1_000_000.0))
}

impl RawRateEntry {
    fn into_pricing(self) -> Option<ModelPricing> {
        let input = per_million(self.input_cost_per_token.or(self.input_cost_per_token_priority))?;
        let output =
            per_million(self.output_cost_per_token.or(self.output_cost_per_token_priority))?;
        let reasoning = per_million(self.output_cost_per_reasoning_token);
        Some(ModelPricing {
            input_per_million: input,
            output_per_million: output,
            cache_read_per_million: per_million(self.cache_read_input_token_cost),
            cache_write_per_million: per_million(self.cache_creation_input_token_cost),
            reasoning_per_million: reasoning,
            reasoning_billing: if reasoning.is_some() {
                ReasoningBilling::Separate
            } else {
                ReasoningBilling::IncludedInOutput
            },
        })
    }
}

/// Validate an upstream rate-table document into per-million pricing.
///
/// Entries that fail to deserialize or lack input/output rates are skipped;
/// a document with no usable entry at all is an error.
pub(crate) fn normalize_rate_table(
    document: serde_json::Value,
) -> Result<HashMap<String, ModelPricing>, PricingError> {
    let serde_json::Value::Object(entries) = document else {
        return Err(PricingError::InvalidPayload(
            "expected an object keyed by model name".to_string(),
        ));
    };

    let mut models = HashMap::new();
    for (name, value) in entries {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let Ok(raw) = serde_json::from_value::<RawRateEntry>(value) else {
            continue;
        };
        if let Some(pricing) = raw.into_pricing() {
            models.entry(key).or_insert(pricing);
        }
    }

    if models.is_empty() {
        return Err(PricingError::EmptyRateTable);
    }
    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_per_token_rates_to_per_million() {
        let models = normalize_rate_table(json!({
            "claude-sonnet-4-5": {
                "input_cost_per_token": 3e-6,
                "output_cost_per_token": 1.5e-5,
                "cache_read_input_token_cost": 3e-7,
                "cache_creation_input_token_cost": 3.75e-6,
                "max_tokens": 64000,
                "litellm_provider": "anthropic"
            }
        }))
        .unwrap();
        let p = &models["claude-sonnet-4-5"];
        assert_eq!(p.input_per_million, 3.0);
        assert_eq!(p.output_per_million, 15.0);
        assert_eq!(p.cache_read_per_million, Some(0.3));
        assert_eq!(p.cache_write_per_million, Some(3.75));
        assert_eq!(p.reasoning_per_million, None);
        assert_eq!(p.reasoning_billing, ReasoningBilling::IncludedInOutput);
    }

    #[test]
    fn reasoning_rate_implies_separate_billing() {
        let models = normalize_rate_table(json!({
            "o-think": {
                "input_cost_per_token": 1e-6,
                "output_cost_per_token": 2e-6,
                "output_cost_per_reasoning_token": 4e-6
            }
        }))
        .unwrap();
        assert_eq!(models["o-think"].reasoning_per_million, Some(4.0));
        assert_eq!(models["o-think"].reasoning_billing, ReasoningBilling::Separate);
    }

    #[test]
    fn priority_rates_fill_missing_base_rates() {
        let models = normalize_rate_table(json!({
            "Flex-Model": {
                "input_cost_per_token_priority": 2e-6,
                "output_cost_per_token_priority": 8e-6
            }
        }))
        .unwrap();
        assert_eq!(models["flex-model"].input_per_million, 2.0);
        assert_eq!(models["flex-model"].output_per_million, 8.0);
    }

    #[test]
    fn incomplete_and_malformed_entries_are_skipped() {
        let models = normalize_rate_table(json!({
            "sample_spec": { "input_cost_per_token": "see docs", "output_cost_per_token": 0 },
            "embed-only": { "input_cost_per_token": 1e-7 },
            "negative": { "input_cost_per_token": -1.0, "output_cost_per_token": 1e-6 },
            "good": { "input_cost_per_token": 1e-6, "output_cost_per_token": 2e-6 }
        }))
        .unwrap();
        assert_eq!(models.len(), 1);
        assert!(models.contains_key("good"));
    }

    #[test]
    fn empty_table_is_an_error() {
        let err = normalize_rate_table(json!({ "x": { "mode": "embedding" } })).unwrap_err();
        assert!(matches!(err, PricingError::EmptyRateTable));
        let err = normalize_rate_table(json!([1, 2])).unwrap_err();
        assert!(matches!(err, PricingError::InvalidPayload(_)));
    }

    #[test]
    fn cache_payload_drops_invalid_rates() {
        let payload: PricingCachePayload = serde_json::from_value(json!({
            "fetchedAt": "2025-06-01T00:00:00Z",
            "sourceUrl": "https://example.test/prices.json",
            "pricingByModel": {
                "a": { "inputPerMillion": 1.0, "outputPerMillion": 2.0 },
                "b": { "inputPerMillion": -1.0, "outputPerMillion": 2.0 }
            }
        }))
        .unwrap();
        let payload = payload.validated().unwrap();
        assert_eq!(payload.pricing_by_model.len(), 1);
        assert_eq!(
            payload.pricing_by_model["a"].reasoning_billing,
            ReasoningBilling::IncludedInOutput
        );
    }
}
