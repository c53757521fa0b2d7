//! Combining per-provider rates into one averaged map.

use std::collections::BTreeMap;
use tracing::{debug, warn};
use xrates_common::{Currency, ProviderResult, RateMap};

/// Average every currency reported by any non-absent provider.
///
/// Currencies outside the requested symbols are kept. A currency reported
/// by a single provider is passed through unchanged. Absent providers
/// contribute nothing; if all are absent the result is empty.
pub fn combine_rates(results: &[ProviderResult]) -> RateMap {
    let mut combined: BTreeMap<Currency, Vec<f64>> = BTreeMap::new();

    for result in results {
        let Some(rates) = &result.rates else {
            debug!(provider = %result.provider, "No rates from provider");
            continue;
        };

        for (currency, rate) in rates {
            if !rate.is_finite() {
                warn!(
                    provider = %result.provider,
                    currency = %currency,
                    rate,
                    "Skipping non-finite rate"
                );
                continue;
            }
            // Providers may report keys in any case.
            combined
                .entry(Currency::new(currency))
                .or_default()
                .push(*rate);
        }
    }

    combined
        .into_iter()
        .filter_map(|(currency, values)| {
            let average = mean(&values)?;
            debug!(
                currency = %currency,
                average,
                sources = values.len(),
                "Calculated average"
            );
            Some((currency, average))
        })
        .collect()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
