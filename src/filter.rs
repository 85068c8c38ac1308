use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::normalize::NormalizedRow;

pub const DEFAULT_DCAT_FILTER: &str = "boulder";
pub const FINAL_ROUND: &str = "Final";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Case-insensitive substring matched against the discipline name.
    pub dcat_filter: String,
    pub only_finalists: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            dcat_filter: DEFAULT_DCAT_FILTER.to_string(),
            only_finalists: true,
        }
    }
}

/// A normalized row inside the selected discipline family, keyed by competition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredRow {
    pub event_id: u32,
    pub event_name: String,
    pub dcat_id: u32,
    pub dcat: String,
    pub status_as_of: Option<String>,
    pub athlete_id: u64,
    pub athlete_name: String,
    pub athlete_country: String,
    pub comp_rank: Option<u32>,
    pub round: String,
    pub score: Option<String>,
    pub round_rank: Option<u32>,
    pub comp_id: String,
}

impl FilteredRow {
    fn from_normalized(row: &NormalizedRow) -> Self {
        Self {
            event_id: row.event_id,
            event_name: row.event_name.clone(),
            dcat_id: row.dcat_id,
            dcat: row.dcat.clone(),
            status_as_of: row.status_as_of.clone(),
            athlete_id: row.athlete_id,
            athlete_name: row.athlete_name.clone(),
            athlete_country: row.athlete_country.clone(),
            comp_rank: row.comp_rank,
            round: row.round.clone(),
            score: row.score.clone(),
            round_rank: row.round_rank,
            comp_id: comp_id(row.event_id, row.dcat_id),
        }
    }

    pub fn is_final(&self) -> bool {
        self.round == FINAL_ROUND
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub rows: Vec<FilteredRow>,
    /// Competitions that had rows but no "Final" round; the finalist filter empties them.
    pub comps_without_final: Vec<String>,
}

/// Decimal concatenation of event and discipline ids.
pub fn comp_id(event_id: u32, dcat_id: u32) -> String {
    format!("{event_id}{dcat_id}")
}

pub fn filter_rows(rows: &[NormalizedRow], options: &FilterOptions) -> Result<FilterOutcome> {
    let needle = options.dcat_filter.trim().to_lowercase();
    if needle.is_empty() {
        return Err(PipelineError::config("discipline filter must not be blank"));
    }

    let selected = rows
        .iter()
        .filter(|row| row.dcat.to_lowercase().contains(&needle))
        .map(FilteredRow::from_normalized)
        .collect::<Vec<_>>();
    debug!(
        filter = %needle,
        before = rows.len(),
        after = selected.len(),
        "discipline filter applied"
    );

    if !options.only_finalists {
        return Ok(FilterOutcome {
            rows: selected,
            comps_without_final: Vec::new(),
        });
    }

    let finalists = selected
        .iter()
        .filter(|row| row.is_final())
        .map(|row| (row.comp_id.as_str(), row.athlete_id))
        .collect::<HashSet<_>>();
    let comps_with_final = finalists
        .iter()
        .map(|(comp, _)| *comp)
        .collect::<HashSet<_>>();

    let mut seen = HashSet::new();
    let mut comps_without_final = Vec::new();
    for row in &selected {
        let comp = row.comp_id.as_str();
        if !comps_with_final.contains(comp) && seen.insert(comp) {
            comps_without_final.push(comp.to_string());
        }
    }
    for comp in &comps_without_final {
        warn!(comp_id = %comp, "no Final round recorded, competition has no finalists");
    }

    let kept = selected
        .iter()
        .filter(|row| finalists.contains(&(row.comp_id.as_str(), row.athlete_id)))
        .cloned()
        .collect::<Vec<_>>();
    debug!(before = selected.len(), after = kept.len(), "finalist filter applied");

    Ok(FilterOutcome {
        rows: kept,
        comps_without_final,
    })
}

/// Athlete ids in first-seen order.
pub fn distinct_athlete_ids(rows: &[FilteredRow]) -> Vec<u64> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| row.athlete_id)
        .filter(|id| seen.insert(*id))
        .collect()
}
