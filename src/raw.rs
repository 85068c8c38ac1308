use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{PipelineError, Result};

pub const FINISHED_STATUS: &str = "finished";

/// All discipline results fetched for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEventResult {
    pub event_id: u32,
    pub results: Vec<RawDisciplineResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawDisciplineResult {
    pub dcat_id: u32,
    pub dcat: String,
    pub event: String,
    pub status: String,
    pub status_as_of: Option<String>,
    pub ranking: Vec<RawAthleteRanking>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAthleteRanking {
    pub athlete_id: u64,
    pub name: String,
    pub country: String,
    pub rank: Option<u32>,
    pub rounds: Vec<RawRoundScore>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRoundScore {
    pub round_name: String,
    pub score: Option<String>,
    pub rank: Option<u32>,
}

// Shape of `events/{id}/result/{dcat}`; the dcat id is not part of the payload.
#[derive(Debug, Deserialize)]
struct DisciplinePayload {
    dcat: String,
    event: String,
    status: String,
    status_as_of: Option<String>,
    ranking: Vec<RawAthleteRanking>,
}

impl RawDisciplineResult {
    pub fn is_finished(&self) -> bool {
        self.status == FINISHED_STATUS
    }

    /// Builds a discipline result from the API payload requested for `dcat_id`.
    pub fn from_value(event_id: u32, dcat_id: u32, value: Value) -> Result<Self> {
        let payload: DisciplinePayload = serde_json::from_value(value)
            .map_err(|err| PipelineError::malformed(Some(event_id), Some(dcat_id), err.to_string()))?;
        Ok(Self {
            dcat_id,
            dcat: payload.dcat,
            event: payload.event,
            status: payload.status,
            status_as_of: payload.status_as_of,
            ranking: payload.ranking,
        })
    }

    pub fn from_json(event_id: u32, dcat_id: u32, raw: &str) -> Result<Self> {
        let value = parse_document(raw, Some(event_id), Some(dcat_id))?;
        Self::from_value(event_id, dcat_id, value)
    }
}

impl RawEventResult {
    /// Parses an assembled event document:
    /// `{"event_id": .., "results": [{"dcat_id": .., "dcat": .., "ranking": [..]}, ..]}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value = parse_document(raw, None, None)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let event_id = value
            .get("event_id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| PipelineError::malformed(None, None, "missing or invalid `event_id`"))?;

        let Some(items) = value.get("results").and_then(Value::as_array) else {
            return Err(PipelineError::malformed(
                Some(event_id),
                None,
                "missing or invalid `results`",
            ));
        };

        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let dcat_id = item
                .get("dcat_id")
                .and_then(Value::as_u64)
                .and_then(|id| u32::try_from(id).ok())
                .ok_or_else(|| {
                    PipelineError::malformed(Some(event_id), None, "missing or invalid `dcat_id`")
                })?;
            results.push(RawDisciplineResult::from_value(event_id, dcat_id, item.clone())?);
        }

        Ok(Self { event_id, results })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AthleteProfile {
    #[serde(alias = "id")]
    pub athlete_id: u64,
    pub birthday: Option<String>,
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub arm_span: Option<u32>,
    #[serde(default)]
    pub all_results: Vec<AthleteSeasonResult>,
}

/// One entry of an athlete's career listing; only the season is kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AthleteSeasonResult {
    #[serde(default, deserialize_with = "lenient_u32")]
    pub season: Option<u32>,
}

impl AthleteProfile {
    pub fn first_season(&self) -> Option<u32> {
        self.all_results.iter().filter_map(|r| r.season).min()
    }
}

fn parse_document(raw: &str, event_id: Option<u32>, dcat_id: Option<u32>) -> Result<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(PipelineError::malformed(event_id, dcat_id, "empty document"));
    }
    serde_json::from_str(trimmed)
        .map_err(|err| PipelineError::malformed(event_id, dcat_id, format!("invalid json: {err}")))
}

// The API is inconsistent about numbers: seasons arrive as "2023" or 2023, heights as 0 for unknown.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u32)),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.parse::<u32>().map_err(serde::de::Error::custom)?)
            }
        }
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected number or numeric string, got {other}"
            )));
        }
    };
    Ok(parsed.filter(|n| *n != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn season_accepts_strings_and_numbers() {
        let profile: AthleteProfile = serde_json::from_value(json!({
            "id": 7,
            "birthday": "1999-01-02",
            "gender": "female",
            "height": "168",
            "arm_span": null,
            "all_results": [{"season": "2019"}, {"season": 2017}, {"season": null}]
        }))
        .unwrap();
        assert_eq!(profile.athlete_id, 7);
        assert_eq!(profile.height, Some(168));
        assert_eq!(profile.arm_span, None);
        assert_eq!(profile.first_season(), Some(2017));
    }

    #[test]
    fn zero_height_reads_as_unknown() {
        let profile: AthleteProfile =
            serde_json::from_value(json!({"athlete_id": 1, "height": 0})).unwrap();
        assert_eq!(profile.height, None);
        assert_eq!(profile.first_season(), None);
    }

    #[test]
    fn discipline_missing_ranking_is_malformed() {
        let err = RawDisciplineResult::from_value(
            1452,
            76,
            json!({"dcat": "Men Boulder", "event": "Keqiao", "status": "finished"}),
        )
        .unwrap_err();
        match err {
            PipelineError::MalformedInput {
                event_id, dcat_id, ..
            } => {
                assert_eq!(event_id, Some(1452));
                assert_eq!(dcat_id, Some(76));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
