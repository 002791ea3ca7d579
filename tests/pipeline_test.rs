//! End-to-end runs of the compile pipeline over temp directories of series files.

mod common;

use chess_core::{normalize_fen, PositionKey};
use common::{game, game_without_clocks, write_series, Workspace, SUBJECT};
use position_index::{read_export, run, CancelToken, Mode, RunStatus};
use std::fs;

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

fn key(fen: &str) -> String {
    normalize_fen(fen).unwrap().into_string()
}

#[test]
fn test_subject_white_scenario() {
    let ws = Workspace::new();
    let mut g = game(
        "scenario",
        "white",
        "https://www.youtube.com/watch?v=abc123",
        &[("e4", Some("0:15:00")), ("e5", Some("0:15:03")), ("Nf3", Some("0:14:53.4"))],
    );
    g["time_control"] = "900+10".into();
    write_series(ws.input.path(), "series.json", &[g]);

    let outcome = ws.run();
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.report.summary.games_succeeded, 1);

    let table = read_export(ws.export_path()).unwrap();

    let start = &table[PositionKey::start().as_str()];
    assert_eq!(start.next_by_subject, vec!["e4"]);
    assert!(start.next_faced.is_empty());
    assert_eq!(start.video_refs[0].offset_seconds, 0);

    let after_e4 = &table[&key(AFTER_E4)];
    assert_eq!(after_e4.next_faced, vec!["e5"]);
    assert_eq!(after_e4.video_refs.len(), 1);
    assert_eq!(after_e4.video_refs[0].video_id, "abc123");
    assert_eq!(after_e4.video_refs[0].offset_seconds, 10);

    // e5 costs black 7s; Nf3 costs white 16.6s.
    let offsets: Vec<u32> = table
        .values()
        .flat_map(|r| r.video_refs.iter().map(|v| v.offset_seconds))
        .collect();
    assert!(offsets.contains(&17));
    assert!(offsets.contains(&33));
}

#[test]
fn test_transposition_collapses_to_one_position() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[
            game_without_clocks("g1", "white", &["e4", "c5", "Nf3"]),
            game_without_clocks("g2", "white", &["Nf3", "c5", "e4"]),
        ],
    );
    ws.run();

    let table = read_export(ws.export_path()).unwrap();
    let shared = key("rnbqkbnr/pp1ppppp/8/2p5/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
    let record = &table[&shared];
    // One node, reached by both games.
    assert_eq!(record.video_refs.len(), 1);
    assert_eq!(table.keys().filter(|k| **k == shared).count(), 1);
}

#[test]
fn test_offsets_monotonic_with_bad_clocks() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[game(
            "bumpy",
            "black",
            "https://youtu.be/bumpy?t=30",
            &[
                ("d4", Some("0:02:58")),
                ("d5", None),
                ("c4", Some("0:03:10")),
                ("e6", Some("0:02:50")),
                ("Nc3", None),
                ("Nf6", Some("0:02:40")),
            ],
        )],
    );
    let outcome = ws.run();
    assert_eq!(outcome.status, RunStatus::Success);
    assert!(outcome.report.summary.anomalous_plies >= 3);

    let table = read_export(ws.export_path()).unwrap();
    let mut offsets: Vec<u32> = table
        .values()
        .flat_map(|r| r.video_refs.iter().map(|v| v.offset_seconds))
        .collect();
    assert_eq!(offsets.len(), 7);
    offsets.sort();
    // t=30 start, nothing before it.
    assert_eq!(offsets[0], 30);
}

#[test]
fn test_input_order_does_not_change_export() {
    let a = game_without_clocks("a", "white", &["e4", "e5", "Nf3", "Nc6"]);
    let b = game_without_clocks("b", "black", &["e4", "c5", "Nf3"]);
    let c = game_without_clocks("c", "white", &["Nf3", "c5", "e4"]);

    let first = Workspace::new();
    write_series(first.input.path(), "1.json", &[a.clone(), b.clone()]);
    write_series(first.input.path(), "2.json", &[c.clone()]);
    first.run();

    let second = Workspace::new();
    write_series(second.input.path(), "1.json", &[c]);
    write_series(second.input.path(), "2.json", &[b, a]);
    second.run();

    assert_eq!(first.export_text(), second.export_text());
}

#[test]
fn test_rebuild_is_idempotent() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[
            game_without_clocks("g1", "white", &["e4", "e5"]),
            game_without_clocks("g2", "black", &["d4", "Nf6", "c4"]),
        ],
    );
    ws.run();
    let once = ws.export_text();
    let snapshot_once = fs::read(ws.config().snapshot).unwrap();
    ws.run();
    assert_eq!(once, ws.export_text());
    assert_eq!(snapshot_once, fs::read(ws.config().snapshot).unwrap());
}

#[test]
fn test_subject_move_listed_once() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[
            game_without_clocks("g1", "white", &["e4", "e5", "Nf3"]),
            game_without_clocks("g2", "white", &["e4", "e5", "Nf3", "Nc6"]),
        ],
    );
    ws.run();

    let table = read_export(ws.export_path()).unwrap();
    let after_e5 = key("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    assert_eq!(table[&after_e5].next_by_subject, vec!["Nf3"]);
}

#[test]
fn test_partial_failure_exit_code() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[
            game_without_clocks("good", "white", &["e4"]),
            game_without_clocks("illegal", "white", &["e4", "e5", "Ke3"]),
        ],
    );
    let outcome = ws.run();
    assert_eq!(outcome.status, RunStatus::PartialFailure);
    assert_eq!(outcome.status.exit_code(), 1);

    // The illegal game's prefix is still indexed.
    let table = read_export(ws.export_path()).unwrap();
    let after_e5 = key("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    assert!(table.contains_key(&after_e5));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ws.config().report).unwrap()).unwrap();
    assert_eq!(report["summary"]["games_failed"], 1);
}

#[test]
fn test_empty_input_exits_fatal() {
    let ws = Workspace::new();
    let outcome = ws.run();
    assert_eq!(outcome.status.exit_code(), 2);
    assert!(!ws.export_path().exists());
}

#[test]
fn test_refresh_titles_keeps_graph() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[game_without_clocks("g1", "white", &["e4", "e5"])],
    );
    ws.run();
    let before = read_export(ws.export_path()).unwrap();
    assert!(before.values().all(|r| r.video_refs.iter().all(|v| v.title.is_none())));

    // Input disappears; refresh never reads it.
    fs::remove_file(ws.input.path().join("series.json")).unwrap();
    let titles = ws.output.path().join("titles.json");
    fs::write(&titles, r#"{"vid0": "Speedrun ep. 1"}"#).unwrap();

    let mut config = ws.config();
    config.mode = Mode::RefreshTitles;
    config.titles = Some(titles);
    let outcome = run(&config, &CancelToken::new()).unwrap();
    assert_eq!(outcome.status, RunStatus::Success);

    let after = read_export(ws.export_path()).unwrap();
    assert_eq!(before.keys().collect::<Vec<_>>(), after.keys().collect::<Vec<_>>());
    let start = &after[PositionKey::start().as_str()];
    assert_eq!(start.video_refs[0].title.as_deref(), Some("Speedrun ep. 1"));
}

#[test]
fn test_cancelled_run_reports_skipped() {
    let ws = Workspace::new();
    write_series(
        ws.input.path(),
        "series.json",
        &[game_without_clocks("g1", "white", &["e4"])],
    );
    let cancel = CancelToken::new();
    cancel.cancel();
    let outcome = run(&ws.config(), &cancel).unwrap();
    assert_eq!(outcome.report.summary.games_skipped, 1);
    assert_eq!(outcome.report.summary.games_succeeded, 0);
}

#[test]
fn test_subject_detected_by_username_case() {
    let ws = Workspace::new();
    let mut g = game_without_clocks("g1", "black", &["e4", "e5"]);
    g["players"][0]["username"] = SUBJECT.to_uppercase().into();
    write_series(ws.input.path(), "series.json", &[g]);
    ws.run();

    let table = read_export(ws.export_path()).unwrap();
    assert_eq!(table[&key(AFTER_E4)].next_by_subject, vec!["e5"]);
    assert_eq!(table[PositionKey::start().as_str()].next_faced, vec!["e4"]);
}

#[test]
fn test_movetext_and_plies_spellings_share_edges() {
    let ws = Workspace::new();
    let mut pgn = game_without_clocks("pgn", "white", &[]);
    let obj = pgn.as_object_mut().unwrap();
    obj.remove("plies");
    obj.insert(
        "movetext".to_string(),
        "1. Ngf3 {[%clk 0:02:58]} d5 {[%clk 0:02:57]} ; chat shouts\n2. d4 {[%clk 0:02:50]} *".into(),
    );
    write_series(
        ws.input.path(),
        "series.json",
        &[pgn, game_without_clocks("plies", "white", &["Nf3!", "d5", "d4"])],
    );

    let outcome = ws.run();
    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.report.summary.games_succeeded, 2);

    let table = read_export(ws.export_path()).unwrap();
    assert_eq!(table[PositionKey::start().as_str()].next_by_subject, vec!["Nf3"]);
    let after_d4 = key("rnbqkbnr/ppp1pppp/8/3p4/3P4/5N2/PPP1PPPP/RNBQKB1R b KQkq - 0 2");
    assert_eq!(table[&after_d4].video_refs.len(), 2);
}
