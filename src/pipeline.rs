use anyhow::Result;
use tracing::info;

use crate::enrich::{EnrichedRow, enrich_with};
use crate::filter::{FilterOptions, filter_rows};
use crate::normalize::{NormalizedRow, normalize};
use crate::raw::{AthleteProfile, RawEventResult};
use crate::source::{ResultsSource, collect_event_results};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub events: usize,
    pub normalized: Vec<NormalizedRow>,
    pub rows: Vec<EnrichedRow>,
    pub comps_without_final: Vec<String>,
    pub athletes: usize,
    pub missing_profiles: Vec<u64>,
    pub errors: Vec<String>,
}

/// Normalize, filter and enrich already-fetched results.
pub fn transform<F>(
    events: &[RawEventResult],
    options: &FilterOptions,
    parallelism: usize,
    lookup: F,
) -> Result<RunReport>
where
    F: Fn(u64) -> Result<Option<AthleteProfile>> + Sync,
{
    let normalized = normalize(events);
    let filtered = filter_rows(&normalized, options)?;
    info!(
        normalized = normalized.len(),
        filtered = filtered.rows.len(),
        "results filtered"
    );

    let (rows, profiles) = enrich_with(&filtered.rows, parallelism, lookup);
    let athletes = profiles.attributes.len() + profiles.missing.len() + profiles.errors.len();
    info!(rows = rows.len(), athletes, "results enriched");

    Ok(RunReport {
        events: events.len(),
        normalized,
        rows,
        comps_without_final: filtered.comps_without_final,
        athletes,
        missing_profiles: profiles.missing,
        errors: profiles.errors,
    })
}

/// Fetch a season from `source` and run it through `transform`.
pub fn run_pipeline<S>(
    source: &S,
    year: i32,
    options: &FilterOptions,
    parallelism: usize,
) -> Result<RunReport>
where
    S: ResultsSource + Sync,
{
    let events = collect_event_results(source, year)?;
    transform(&events, options, parallelism, |id| {
        source.fetch_athlete_profile(id)
    })
}
