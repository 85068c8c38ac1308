use anyhow::{Context, Result};
use tracing::info;

use crate::raw::{AthleteProfile, RawDisciplineResult, RawEventResult};

/// Where raw results come from. `ResultsApi` talks to the live service; tests use in-memory fakes.
pub trait ResultsSource {
    fn list_event_ids(&self, year: i32) -> Result<Vec<u32>>;

    fn list_dcat_ids(&self, event_id: u32) -> Result<Vec<u32>>;

    fn fetch_discipline_result(&self, event_id: u32, dcat_id: u32) -> Result<RawDisciplineResult>;

    /// `Ok(None)` when the service has no profile for the athlete.
    fn fetch_athlete_profile(&self, athlete_id: u64) -> Result<Option<AthleteProfile>>;
}

/// Fetches every discipline of every league event in `year`, one request at a time.
pub fn collect_event_results<S>(source: &S, year: i32) -> Result<Vec<RawEventResult>>
where
    S: ResultsSource + ?Sized,
{
    let event_ids = source
        .list_event_ids(year)
        .with_context(|| format!("list events for {year}"))?;
    info!(year, events = event_ids.len(), "resolved season events");

    let mut events = Vec::with_capacity(event_ids.len());
    for event_id in event_ids {
        let dcat_ids = source
            .list_dcat_ids(event_id)
            .with_context(|| format!("list disciplines for event {event_id}"))?;

        let mut results = Vec::with_capacity(dcat_ids.len());
        for dcat_id in dcat_ids {
            let result = source
                .fetch_discipline_result(event_id, dcat_id)
                .with_context(|| format!("fetch result for event {event_id} dcat {dcat_id}"))?;
            results.push(result);
        }
        info!(event_id, disciplines = results.len(), "fetched event results");
        events.push(RawEventResult { event_id, results });
    }
    Ok(events)
}
