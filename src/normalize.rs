use serde::Serialize;
use tracing::debug;

use crate::raw::{RawAthleteRanking, RawDisciplineResult, RawEventResult, RawRoundScore};

/// One athlete's score in one round of one discipline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRow {
    pub event_id: u32,
    pub event_name: String,
    pub dcat_id: u32,
    pub dcat: String,
    pub status: String,
    pub status_as_of: Option<String>,
    pub athlete_id: u64,
    pub athlete_name: String,
    pub athlete_country: String,
    pub comp_rank: Option<u32>,
    pub round: String,
    pub score: Option<String>,
    pub round_rank: Option<u32>,
}

pub const NORMALIZED_COLUMNS: &[&str] = &[
    "event_id",
    "event_name",
    "dcat_id",
    "dcat",
    "status",
    "status_as_of",
    "athlete_id",
    "athlete_name",
    "athlete_country",
    "comp_rank",
    "round",
    "score",
    "round_rank",
];

impl NormalizedRow {
    fn new(
        event: &RawEventResult,
        discipline: &RawDisciplineResult,
        athlete: &RawAthleteRanking,
        round: &RawRoundScore,
    ) -> Self {
        Self {
            event_id: event.event_id,
            event_name: discipline.event.clone(),
            dcat_id: discipline.dcat_id,
            dcat: discipline.dcat.clone(),
            status: discipline.status.clone(),
            status_as_of: discipline.status_as_of.clone(),
            athlete_id: athlete.athlete_id,
            athlete_name: athlete.name.clone(),
            athlete_country: athlete.country.clone(),
            comp_rank: athlete.rank,
            round: round.round_name.clone(),
            score: round.score.clone(),
            round_rank: round.rank,
        }
    }
}

/// Event -> finished discipline -> athlete -> round, in input order.
///
/// Athletes without rounds and disciplines without a ranking yield nothing.
pub fn flatten(events: &[RawEventResult]) -> impl Iterator<Item = NormalizedRow> + '_ {
    events
        .iter()
        .flat_map(|event| {
            event
                .results
                .iter()
                .filter(|discipline| discipline.is_finished())
                .map(move |discipline| (event, discipline))
        })
        .flat_map(|(event, discipline)| {
            discipline
                .ranking
                .iter()
                .map(move |athlete| (event, discipline, athlete))
        })
        .flat_map(|(event, discipline, athlete)| {
            athlete
                .rounds
                .iter()
                .map(move |round| NormalizedRow::new(event, discipline, athlete, round))
        })
}

pub fn normalize(events: &[RawEventResult]) -> Vec<NormalizedRow> {
    let skipped = events
        .iter()
        .flat_map(|event| event.results.iter())
        .filter(|discipline| !discipline.is_finished())
        .count();
    let without_rounds = events
        .iter()
        .flat_map(|event| event.results.iter())
        .filter(|discipline| discipline.is_finished())
        .flat_map(|discipline| discipline.ranking.iter())
        .filter(|athlete| athlete.rounds.is_empty())
        .count();

    let rows = flatten(events).collect::<Vec<_>>();
    debug!(
        events = events.len(),
        rows = rows.len(),
        unfinished_disciplines = skipped,
        athletes_without_rounds = without_rounds,
        "normalized results"
    );
    rows
}

/// Number of rows `normalize` emits: rounds summed over finished disciplines.
pub fn expected_row_count(events: &[RawEventResult]) -> usize {
    events
        .iter()
        .flat_map(|event| event.results.iter())
        .filter(|discipline| discipline.is_finished())
        .flat_map(|discipline| discipline.ranking.iter())
        .map(|athlete| athlete.rounds.len())
        .sum()
}
