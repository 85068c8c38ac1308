use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::error::PipelineError;
use crate::http_client::{fetch_json, fetch_json_optional, http_client};
use crate::raw::{AthleteProfile, RawDisciplineResult};
use crate::source::ResultsSource;

/// Calendar year of season id 2; ids count up by one per year from there.
pub const FIRST_SEASON_YEAR: i32 = 1990;
const FIRST_SEASON_ID: i32 = 2;

/// Blocking client for the federation's results API.
pub struct ResultsApi {
    client: Client,
    base_url: String,
}

impl ResultsApi {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            client: http_client(settings)?,
            base_url: settings.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl ResultsSource for ResultsApi {
    fn list_event_ids(&self, year: i32) -> Result<Vec<u32>> {
        let season_id = season_id_for_year(year)?;
        let url = self.url(&format!("seasons/{season_id}"));
        debug!(%url, "fetching season");
        let season = fetch_json(&self.client, &url).context("season request failed")?;
        parse_season_event_ids(&season)
    }

    fn list_dcat_ids(&self, event_id: u32) -> Result<Vec<u32>> {
        let url = self.url(&format!("events/{event_id}"));
        debug!(%url, "fetching event");
        let event = fetch_json(&self.client, &url).context("event request failed")?;
        parse_dcat_ids(&event)
    }

    fn fetch_discipline_result(&self, event_id: u32, dcat_id: u32) -> Result<RawDisciplineResult> {
        let url = self.url(&format!("events/{event_id}/result/{dcat_id}"));
        debug!(%url, "fetching discipline result");
        let payload = fetch_json(&self.client, &url).context("result request failed")?;
        Ok(RawDisciplineResult::from_value(event_id, dcat_id, payload)?)
    }

    fn fetch_athlete_profile(&self, athlete_id: u64) -> Result<Option<AthleteProfile>> {
        let url = self.url(&format!("athletes/{athlete_id}"));
        debug!(%url, "fetching athlete");
        let Some(value) =
            fetch_json_optional(&self.client, &url).context("athlete request failed")?
        else {
            return Ok(None);
        };
        let profile = serde_json::from_value(value)
            .with_context(|| format!("invalid athlete {athlete_id} json"))?;
        Ok(Some(profile))
    }
}

pub fn season_id_for_year(year: i32) -> std::result::Result<u32, PipelineError> {
    if year < FIRST_SEASON_YEAR {
        return Err(PipelineError::config(format!(
            "no season before {FIRST_SEASON_YEAR} (got {year})"
        )));
    }
    u32::try_from(year - FIRST_SEASON_YEAR + FIRST_SEASON_ID)
        .map_err(|_| PipelineError::config(format!("year {year} out of range")))
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    leagues: Vec<SeasonLeague>,
    #[serde(default)]
    events: Vec<SeasonEvent>,
}

#[derive(Debug, Deserialize)]
struct SeasonLeague {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SeasonEvent {
    event_id: u32,
    league_season_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    dcats: Vec<EventDcat>,
}

#[derive(Debug, Deserialize)]
struct EventDcat {
    dcat_id: u32,
}

/// Events of the season's primary league, i.e. the first one listed.
pub fn parse_season_event_ids(season: &Value) -> Result<Vec<u32>> {
    let parsed = SeasonResponse::deserialize(season).context("invalid season json")?;
    let league = parsed
        .leagues
        .first()
        .ok_or_else(|| anyhow!("season lists no leagues"))?;
    let league_id = league_id_from_url(&league.url)?;

    Ok(parsed
        .events
        .into_iter()
        .filter(|event| event.league_season_id == Some(league_id))
        .map(|event| event.event_id)
        .collect())
}

pub fn parse_dcat_ids(event: &Value) -> Result<Vec<u32>> {
    let parsed = EventResponse::deserialize(event).context("invalid event json")?;
    Ok(parsed.dcats.into_iter().map(|dcat| dcat.dcat_id).collect())
}

/// `"/api/v1/season_leagues/431"` -> 431.
pub fn league_id_from_url(url: &str) -> Result<u32> {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    last.parse::<u32>()
        .with_context(|| format!("league url without numeric id: {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_year_to_season_id() {
        assert_eq!(season_id_for_year(2025).unwrap(), 37);
        assert_eq!(season_id_for_year(1990).unwrap(), 2);
        assert!(season_id_for_year(1989).is_err());
    }

    #[test]
    fn league_id_is_last_url_segment() {
        assert_eq!(league_id_from_url("/api/v1/season_leagues/431").unwrap(), 431);
        assert_eq!(league_id_from_url("/api/v1/season_leagues/431/").unwrap(), 431);
        assert!(league_id_from_url("/api/v1/season_leagues/").is_err());
    }
}
