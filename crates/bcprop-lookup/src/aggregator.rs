//! Fan-out of the five provider adapters and the zoning engine into one
//! [`Snapshot`].

use std::future::Future;
use std::time::Duration;

use bcprop_core::{Coordinate, CoordinateError, ProviderResult, Snapshot, ZoningOutcome};
use chrono::Utc;
use futures::FutureExt;
use tokio::time::Instant;

use crate::providers::{Provider, ProviderAdapters};
use crate::zoning::ZoningEngine;

#[derive(Debug, Clone)]
pub struct SnapshotAggregator {
    providers: ProviderAdapters,
    zoning: ZoningEngine,
}

impl SnapshotAggregator {
    #[must_use]
    pub fn new(providers: ProviderAdapters, zoning: ZoningEngine) -> Self {
        Self { providers, zoning }
    }

    #[must_use]
    pub fn zoning(&self) -> &ZoningEngine {
        &self.zoning
    }

    /// Resolve every provider for `coord` concurrently.
    ///
    /// Each branch is bounded by `budget` on its own; a slow or failing
    /// branch becomes an entry in [`Snapshot::errors`] and never fails the
    /// whole resolution. A zoning not-found outcome is kept on the snapshot
    /// for its attempts and also reported as an error.
    ///
    /// The zoning branch prefers the municipality adapter's name over
    /// `hint`, so it waits for that adapter before starting its ladder. The
    /// wait ends as soon as the adapter answers and never exceeds half the
    /// budget. A municipality service that is slow to answer therefore
    /// leaves the ladder only the other half; when it runs out the zoning
    /// branch reports a timeout even though the other branches completed.
    /// Catalogue enrichment stops waiting [`ENRICHMENT_HEADROOM`] before
    /// the budget expires so a found zoning record is never discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] if `coord` is out of range; no request is
    /// issued in that case.
    pub async fn resolve(
        &self,
        coord: Coordinate,
        hint: Option<&str>,
        budget: Duration,
    ) -> Result<Snapshot, CoordinateError> {
        coord.validate()?;

        let deadline = enrichment_deadline(budget);
        let municipality = self.providers.municipality(coord).shared();
        let zoning_branch = {
            let municipality = municipality.clone();
            async move {
                let resolved_name = match tokio::time::timeout(budget / 2, municipality).await {
                    Ok(result) => result.value.and_then(|b| b.name),
                    Err(_) => {
                        tracing::debug!("municipality not ready, zoning uses caller hint");
                        None
                    }
                };
                let effective = resolved_name.as_deref().or(hint);
                let outcome = self.zoning.resolve_by(coord, effective, Some(deadline)).await;
                ProviderResult::ok(outcome)
            }
        };

        let (parcel, municipality, regional_district, alr, floodplain, zoning) = tokio::join!(
            with_budget(Provider::Parcel, budget, self.providers.parcel(coord)),
            with_budget(Provider::Municipality, budget, municipality),
            with_budget(
                Provider::RegionalDistrict,
                budget,
                self.providers.regional_district(coord)
            ),
            with_budget(Provider::Alr, budget, self.providers.alr(coord)),
            with_budget(Provider::Floodplain, budget, self.providers.floodplain(coord)),
            with_budget(Provider::Zoning, budget, zoning_branch),
        );

        let mut errors = Vec::new();
        let parcel = collect(parcel, &mut errors);
        let municipality = collect(municipality, &mut errors);
        let regional_district = collect(regional_district, &mut errors);
        let alr = collect(alr, &mut errors);
        let floodplain = collect(floodplain, &mut errors);
        let zoning = collect(zoning, &mut errors);
        // An exhausted ladder is a zoning failure; an unsupported
        // municipality is not.
        if let Some(ZoningOutcome::NotFound { error, .. }) = &zoning {
            errors.push(format!("{} lookup failed: {error}", Provider::Zoning.label()));
        }

        let snapshot = Snapshot {
            address: None,
            coordinate: coord,
            parcel,
            municipality,
            regional_district,
            alr,
            floodplain,
            zoning,
            errors,
            resolved_at: Utc::now(),
        };

        tracing::info!(
            latitude = coord.latitude,
            longitude = coord.longitude,
            populated = snapshot.populated_field_count(),
            errors = snapshot.errors.len(),
            "snapshot resolved"
        );
        Ok(snapshot)
    }
}

/// Time left to a zoning branch after optional enrichment gives up.
pub const ENRICHMENT_HEADROOM: Duration = Duration::from_millis(100);

/// The instant optional enrichment must give up by for a branch bounded by
/// `budget` that starts now.
#[must_use]
pub fn enrichment_deadline(budget: Duration) -> Instant {
    Instant::now() + budget.saturating_sub(ENRICHMENT_HEADROOM)
}

/// Bound one branch by `budget`, turning expiry into an ordinary error.
pub async fn with_budget<T>(
    provider: Provider,
    budget: Duration,
    branch: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    if let Ok(result) = tokio::time::timeout(budget, branch).await {
        result
    } else {
        tracing::warn!(
            provider = provider.label(),
            budget_ms = budget.as_millis(),
            "provider timed out"
        );
        ProviderResult::err(format!(
            "{} lookup timed out after {}ms",
            provider.label(),
            budget.as_millis()
        ))
    }
}

fn collect<T>(result: ProviderResult<T>, errors: &mut Vec<String>) -> Option<T> {
    let (value, error) = result.into_parts();
    if let Some(error) = error {
        errors.push(error);
    }
    value
}
