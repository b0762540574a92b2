use std::fs;
use std::path::PathBuf;

use spl_stats::match_feed::{parse_games_page_json, parse_match_detail_json};
use spl_stats::standings::parse_standings_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_results_page_fixture() {
    let raw = read_fixture("results_page.json");
    let page = parse_games_page_json(&raw).expect("fixture should parse");
    assert_eq!(page.games.len(), 4);
    assert_eq!(page.games[1].id, 5001);
    assert_eq!(page.games[1].round_num, Some(5));
    assert!(page.games[1].is_ended());
    assert!(!page.games[0].is_ended());
    assert_eq!(page.games[1].label(), "Al Hilal vs Al Nassr");
    assert_eq!(page.previous_page, None);
}

#[test]
fn parses_fixtures_page_fixture() {
    let raw = read_fixture("fixtures_page.json");
    let page = parse_games_page_json(&raw).expect("fixture should parse");
    assert_eq!(page.games.len(), 2);
    assert_eq!(page.next_page, None);
}

#[test]
fn parses_match_detail_fixture() {
    let raw = read_fixture("match_5001.json");
    let game = parse_match_detail_json(&raw, 5001).expect("fixture should parse");
    assert_eq!(game.home_competitor.name, "Al Hilal");
    assert_eq!(game.home_competitor.score, 3);
    assert_eq!(game.away_competitor.score, 1);
    assert_eq!(game.members.len(), 7);
    assert_eq!(game.chart_events().len(), 5);
    let keepers = game
        .home_competitor
        .lineups
        .as_ref()
        .map(|l| l.members.iter().filter(|m| m.is_goalkeeper()).count());
    assert_eq!(keepers, Some(1));
}

#[test]
fn match_detail_without_game_is_an_error() {
    let err = parse_match_detail_json(r#"{"game": null}"#, 77).unwrap_err();
    assert_eq!(err.game_id(), Some(77));
}

#[test]
fn parses_standings_fixture() {
    let raw = read_fixture("standings.json");
    let table = parse_standings_json(&raw).expect("fixture should parse");
    assert_eq!(table.len(), 3);
    assert_eq!(table["Al Nassr"], 4);
}
