#![cfg(target_arch = "wasm32")]

use star_grail::GameEngine;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn seats_four_players_and_starts() {
    let engine = GameEngine::new(Some(r#"{"seed": 7}"#.into()), None).expect("engine");
    for name in ["alice", "bob", "carol", "dave"] {
        let json = engine.handle_text(name, "join").expect("join");
        assert!(json.contains("\"applied\""));
    }
    let json = engine
        .handle_json(r#"{"actor": "alice", "verb": "start"}"#)
        .expect("start");
    assert!(json.contains("MatchStarted"));

    let snapshot = engine.snapshot_json(Some("bob".into())).expect("snapshot");
    assert!(snapshot.contains("\"phase\":\"Action\""));
}

#[wasm_bindgen_test]
fn malformed_catalog_is_refused() {
    assert!(GameEngine::new(None, Some("[]".into())).is_err());
}
