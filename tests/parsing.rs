use std::fs;
use std::path::PathBuf;

use ifsc_results::api::{parse_dcat_ids, parse_season_event_ids};
use ifsc_results::error::PipelineError;
use ifsc_results::raw::{AthleteProfile, RawDisciplineResult, RawEventResult};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn season_lists_primary_league_events_only() {
    let season: serde_json::Value =
        serde_json::from_str(&read_fixture("season.json")).expect("fixture should parse");
    let ids = parse_season_event_ids(&season).expect("season should parse");
    assert_eq!(ids, vec![1405, 1452]);
}

#[test]
fn season_without_leagues_is_an_error() {
    let season = serde_json::json!({"leagues": [], "events": []});
    assert!(parse_season_event_ids(&season).is_err());
}

#[test]
fn event_lists_every_dcat() {
    let event: serde_json::Value =
        serde_json::from_str(&read_fixture("event.json")).expect("fixture should parse");
    assert_eq!(parse_dcat_ids(&event).expect("event should parse"), vec![3, 76, 77]);
}

#[test]
fn parses_discipline_result_fixture() {
    let raw = read_fixture("result_men_boulder.json");
    let result = RawDisciplineResult::from_json(1452, 76, &raw).expect("fixture should parse");
    assert_eq!(result.dcat_id, 76);
    assert_eq!(result.dcat, "BOULDER Men");
    assert!(result.is_finished());
    assert_eq!(result.ranking.len(), 3);
    assert_eq!(result.ranking[0].rounds.len(), 3);
    assert_eq!(result.ranking[0].rounds[2].round_name, "Final");
    assert_eq!(result.ranking[0].rounds[2].score.as_deref(), Some("3T3z 4 3"));
    assert_eq!(result.ranking[2].rank, None);
    assert!(result.ranking[2].rounds.is_empty());
}

#[test]
fn missing_rounds_is_malformed_input() {
    let raw = r#"{
        "event": "E", "dcat": "BOULDER Men", "status": "finished", "status_as_of": null,
        "ranking": [{"athlete_id": 1, "name": "A", "country": "USA", "rank": 1}]
    }"#;
    let err = RawDisciplineResult::from_json(10, 20, raw).expect_err("rounds are required");
    match err {
        PipelineError::MalformedInput {
            event_id,
            dcat_id,
            detail,
        } => {
            assert_eq!(event_id, Some(10));
            assert_eq!(dcat_id, Some(20));
            assert!(detail.contains("rounds"), "detail was {detail}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn null_document_is_malformed_input() {
    let err = RawDisciplineResult::from_json(10, 20, "null").expect_err("null is not a result");
    assert!(matches!(err, PipelineError::MalformedInput { .. }));
}

#[test]
fn assembled_event_names_offending_dcat() {
    let raw = r#"{
        "event_id": 1452,
        "results": [
            {"dcat_id": 76, "event": "E", "dcat": "BOULDER Men", "status": "finished", "ranking": []},
            {"dcat_id": 77, "event": "E", "dcat": "BOULDER Women", "status": "finished"}
        ]
    }"#;
    let err = RawEventResult::from_json(raw).expect_err("second dcat lacks ranking");
    assert!(matches!(
        err,
        PipelineError::MalformedInput {
            event_id: Some(1452),
            dcat_id: Some(77),
            ..
        }
    ));
}

#[test]
fn assembled_event_parses() {
    let raw = r#"{
        "event_id": 1452,
        "results": [
            {"dcat_id": 76, "event": "E", "dcat": "BOULDER Men", "status": "finished", "ranking": []}
        ]
    }"#;
    let event = RawEventResult::from_json(raw).expect("event should parse");
    assert_eq!(event.event_id, 1452);
    assert_eq!(event.results.len(), 1);
    assert!(event.results[0].ranking.is_empty());
}

#[test]
fn parses_athlete_fixture() {
    let profile: AthleteProfile =
        serde_json::from_str(&read_fixture("athlete.json")).expect("fixture should parse");
    assert_eq!(profile.athlete_id, 101);
    assert_eq!(profile.birthday.as_deref(), Some("2001-03-14"));
    assert_eq!(profile.gender.as_deref(), Some("male"));
    assert_eq!(profile.height, Some(168));
    assert_eq!(profile.arm_span, Some(172));
    assert_eq!(profile.first_season(), Some(2019));
}
