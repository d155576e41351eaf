//! Unit tests for the simulated result synthesizer.

use adb_bridge::voice::synthesize_result;

fn score_of(result: &str) -> u32 {
    let (_, score) = result
        .rsplit_once("score: ")
        .expect("result must end with a score clause");
    score.parse().expect("score must be an integer")
}

#[test]
fn score_stays_in_range() {
    for _ in 0..200 {
        let score = score_of(&synthesize_result("hello", "1"));
        assert!((75..100).contains(&score), "score out of range: {score}");
    }
}

#[test]
fn known_area_gets_its_clause() {
    for area in ["1", "2", "3", "4"] {
        let result = synthesize_result("hello", area);
        assert!(
            result.contains(&format!("area {area} ")),
            "area {area} clause missing from: {result}"
        );
    }
}

#[test]
fn unknown_area_gets_generic_clause_not_error() {
    for area in ["9", "0", "abc", ""] {
        let result = synthesize_result("hello", area);
        assert!(
            result.contains("overall performance good"),
            "generic clause missing for area {area:?}: {result}"
        );
    }
}

#[test]
fn long_title_notes_long_sentences() {
    let result = synthesize_result("this title is well over ten characters", "1");
    assert!(result.contains("handles long sentences well"));
}

#[test]
fn short_title_notes_short_sentences() {
    let result = synthesize_result("short", "1");
    assert!(result.contains("clear short-sentence pronunciation"));
}

#[test]
fn empty_title_skips_length_clause() {
    let result = synthesize_result("", "1");
    assert!(!result.contains("sentence"));
}

#[test]
fn title_length_counts_characters_not_bytes() {
    // Ten multibyte characters: not a long sentence.
    let result = synthesize_result("éééééééééé", "1");
    assert!(result.contains("clear short-sentence pronunciation"));
}

#[test]
fn clauses_are_comma_joined() {
    let result = synthesize_result("hello", "2");
    assert!(result.split(", ").count() >= 3, "unexpected shape: {result}");
}
