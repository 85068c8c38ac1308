use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::filter::FilteredRow;
use crate::raw::AthleteProfile;

/// Biographical columns joined onto each result row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AthleteAttributes {
    pub athlete_id: u64,
    pub birthday: Option<String>,
    pub gender: Option<String>,
    pub first_season: Option<u32>,
    pub height: Option<u32>,
    pub arm_span: Option<u32>,
}

impl AthleteAttributes {
    pub fn from_profile(athlete_id: u64, profile: &AthleteProfile) -> Self {
        Self {
            athlete_id,
            birthday: profile.birthday.clone(),
            gender: profile.gender.clone(),
            first_season: profile.first_season(),
            height: profile.height,
            arm_span: profile.arm_span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRow {
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
    pub birthday: Option<String>,
    pub gender: Option<String>,
    pub first_season: Option<u32>,
    pub height: Option<u32>,
    pub arm_span: Option<u32>,
}

pub const ENRICHED_COLUMNS: &[&str] = &[
    "event_id",
    "event_name",
    "dcat_id",
    "dcat",
    "status_as_of",
    "athlete_id",
    "athlete_name",
    "athlete_country",
    "comp_rank",
    "round",
    "score",
    "round_rank",
    "comp_id",
    "birthday",
    "gender",
    "first_season",
    "height",
    "arm_span",
];

impl EnrichedRow {
    fn join(row: &FilteredRow, attributes: Option<&AthleteAttributes>) -> Self {
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
            comp_id: row.comp_id.clone(),
            birthday: attributes.and_then(|a| a.birthday.clone()),
            gender: attributes.and_then(|a| a.gender.clone()),
            first_season: attributes.and_then(|a| a.first_season),
            height: attributes.and_then(|a| a.height),
            arm_span: attributes.and_then(|a| a.arm_span),
        }
    }

    /// Cells in `ENRICHED_COLUMNS` order; nulls render as empty strings.
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.event_id.to_string(),
            self.event_name.clone(),
            self.dcat_id.to_string(),
            self.dcat.clone(),
            self.status_as_of.clone().unwrap_or_default(),
            self.athlete_id.to_string(),
            self.athlete_name.clone(),
            self.athlete_country.clone(),
            opt_to_string(self.comp_rank),
            self.round.clone(),
            self.score.clone().unwrap_or_default(),
            opt_to_string(self.round_rank),
            self.comp_id.clone(),
            self.birthday.clone().unwrap_or_default(),
            self.gender.clone().unwrap_or_default(),
            opt_to_string(self.first_season),
            opt_to_string(self.height),
            opt_to_string(self.arm_span),
        ]
    }
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Left join: every input row appears once, unmatched athletes keep null attributes.
pub fn enrich(
    rows: &[FilteredRow],
    attributes: &HashMap<u64, AthleteAttributes>,
) -> Vec<EnrichedRow> {
    rows.iter()
        .map(|row| EnrichedRow::join(row, attributes.get(&row.athlete_id)))
        .collect()
}

#[derive(Debug, Default)]
pub struct ProfileLookup {
    pub attributes: HashMap<u64, AthleteAttributes>,
    /// Athletes the source had no profile for.
    pub missing: Vec<u64>,
    pub errors: Vec<String>,
}

/// Looks up each id once. With `parallelism > 1` lookups run on a bounded rayon pool.
pub fn lookup_profiles<F>(athlete_ids: &[u64], parallelism: usize, lookup: F) -> ProfileLookup
where
    F: Fn(u64) -> anyhow::Result<Option<AthleteProfile>> + Sync,
{
    let fetch = |id: u64| (id, lookup(id));
    let results: Vec<(u64, anyhow::Result<Option<AthleteProfile>>)> = if parallelism <= 1 {
        athlete_ids.iter().map(|id| fetch(*id)).collect()
    } else {
        with_fetch_pool(parallelism, || {
            athlete_ids.par_iter().map(|id| fetch(*id)).collect()
        })
    };

    let mut out = ProfileLookup::default();
    for (id, result) in results {
        match result {
            Ok(Some(profile)) => {
                out.attributes
                    .insert(id, AthleteAttributes::from_profile(id, &profile));
            }
            Ok(None) => {
                warn!(athlete_id = id, "no athlete profile, biographical fields left empty");
                out.missing.push(id);
            }
            Err(err) => {
                warn!(athlete_id = id, error = %err, "athlete profile lookup failed");
                out.errors.push(format!("athlete {id}: {err:#}"));
            }
        }
    }
    debug!(
        requested = athlete_ids.len(),
        found = out.attributes.len(),
        "athlete profiles resolved"
    );
    out
}

/// Resolves profiles for every distinct athlete in `rows` and left-joins them.
pub fn enrich_with<F>(
    rows: &[FilteredRow],
    parallelism: usize,
    lookup: F,
) -> (Vec<EnrichedRow>, ProfileLookup)
where
    F: Fn(u64) -> anyhow::Result<Option<AthleteProfile>> + Sync,
{
    let ids = crate::filter::distinct_athlete_ids(rows);
    let profiles = lookup_profiles(&ids, parallelism, lookup);
    (enrich(rows, &profiles.attributes), profiles)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
