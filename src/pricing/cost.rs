use super::db::PricingDb;
use super::types::{ModelPricing, ReasoningBilling};
use crate::core::{CostMode, UsageEvent, round_usd};

fn term(tokens: u64, rate: Option<f64>) -> f64 {
    match rate {
        Some(rate) if tokens > 0 && rate.is_finite() && rate > 0.0 => {
            tokens as f64 / 1_000_000.0 * rate
        }
        _ => 0.0,
    }
}

/// USD cost of an event's tokens at `pricing`
pub(crate) fn calculate_cost(event: &UsageEvent, pricing: &ModelPricing) -> f64 {
    let mut cost = term(event.input_tokens, Some(pricing.input_per_million))
        + term(event.output_tokens, Some(pricing.output_per_million))
        + term(event.cache_read_tokens, pricing.cache_read_per_million)
        + term(event.cache_write_tokens, pricing.cache_write_per_million);
    if pricing.reasoning_billing == ReasoningBilling::Separate {
        cost += term(event.reasoning_tokens, pricing.reasoning_per_million);
    }
    round_usd(cost)
}

/// Price one event. Source-reported costs are kept as-is; an event that
/// cannot be priced stays estimated with no cost.
pub(crate) fn apply_cost(mut event: UsageEvent, db: Option<&PricingDb>) -> UsageEvent {
    if event.cost_mode == CostMode::Explicit && event.cost_usd.is_some() {
        return event;
    }
    event.cost_mode = CostMode::Estimated;
    event.cost_usd = match (event.model.as_deref(), db) {
        (Some(model), Some(db)) => db.get_pricing(model).map(|p| calculate_cost(&event, p)),
        _ => None,
    };
    event
}

fn needs_lookup(event: &UsageEvent) -> bool {
    event.model.is_some()
        && (event.cost_mode != CostMode::Explicit
            || event.cost_usd.is_none_or(|cost| cost == 0.0))
}

/// Whether the run has to load a rate table at all
pub(crate) fn needs_pricing(events: &[UsageEvent], forced: bool) -> bool {
    forced || events.iter().any(needs_lookup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn db() -> PricingDb {
        let mut models = HashMap::new();
        models.insert(
            "sonnet-4".to_string(),
            ModelPricing {
                input_per_million: 3.0,
                output_per_million: 15.0,
                cache_read_per_million: Some(0.3),
                cache_write_per_million: Some(3.75),
                ..ModelPricing::default()
            },
        );
        models.insert(
            "thinker".to_string(),
            ModelPricing {
                input_per_million: 1.0,
                output_per_million: 2.0,
                reasoning_per_million: Some(10.0),
                reasoning_billing: ReasoningBilling::Separate,
                ..ModelPricing::default()
            },
        );
        models.insert(
            "bundled".to_string(),
            ModelPricing {
                input_per_million: 1.0,
                output_per_million: 2.0,
                reasoning_per_million: Some(10.0),
                reasoning_billing: ReasoningBilling::IncludedInOutput,
                ..ModelPricing::default()
            },
        );
        PricingDb::new(models)
    }

    fn event(model: Option<&str>) -> UsageEvent {
        let mut e = UsageEvent::new("claude", "s", Utc::now());
        e.model = model.map(str::to_string);
        e
    }

    #[test]
    fn input_and_output_terms() {
        let e = event(Some("sonnet-4")).with_tokens(1_000_000, 100_000);
        let priced = apply_cost(e, Some(&db()));
        assert_eq!(priced.cost_usd, Some(4.5));
        assert_eq!(priced.cost_mode, CostMode::Estimated);
    }

    #[test]
    fn cache_terms() {
        let mut e = event(Some("sonnet-4"));
        e.cache_write_tokens = 1_000_000;
        e.cache_read_tokens = 1_000_000;
        assert_eq!(apply_cost(e, Some(&db())).cost_usd, Some(4.05));
    }

    #[test]
    fn reasoning_only_billed_when_separate() {
        let mut e = event(Some("thinker")).with_tokens(0, 1_000_000);
        e.reasoning_tokens = 1_000_000;
        assert_eq!(apply_cost(e.clone(), Some(&db())).cost_usd, Some(12.0));

        e.model = Some("bundled".into());
        assert_eq!(apply_cost(e, Some(&db())).cost_usd, Some(2.0));
    }

    #[test]
    fn missing_rates_contribute_zero() {
        let mut e = event(Some("thinker"));
        e.cache_read_tokens = 500;
        assert_eq!(apply_cost(e, Some(&db())).cost_usd, Some(0.0));
    }

    #[test]
    fn explicit_cost_passes_through() {
        let e = event(Some("sonnet-4"))
            .with_tokens(1_000_000, 0)
            .with_explicit_cost(0.42);
        let priced = apply_cost(e.clone(), Some(&db()));
        assert_eq!(priced, e);
    }

    #[test]
    fn unpriceable_events_stay_uncosted() {
        let priced = apply_cost(event(None).with_tokens(10, 10), Some(&db()));
        assert_eq!(priced.cost_usd, None);
        assert_eq!(priced.cost_mode, CostMode::Estimated);

        let priced = apply_cost(event(Some("mystery-9000")).with_tokens(10, 10), Some(&db()));
        assert_eq!(priced.cost_usd, None);

        let priced = apply_cost(event(Some("sonnet-4")).with_tokens(10, 10), None);
        assert_eq!(priced.cost_usd, None);
    }

    #[test]
    fn pricing_gate() {
        let explicit = event(Some("m")).with_explicit_cost(0.5);
        assert!(!needs_pricing(std::slice::from_ref(&explicit), false));
        assert!(needs_pricing(std::slice::from_ref(&explicit), true));

        let zero = event(Some("m")).with_explicit_cost(0.0);
        assert!(needs_pricing(&[zero], false));

        assert!(!needs_pricing(&[event(None)], false));
        assert!(needs_pricing(&[event(Some("m"))], false));
        assert!(!needs_pricing(&[], false));
    }
}
