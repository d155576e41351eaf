//! Simulated voice test result synthesis.
//!
//! Stands in for a real speech-analysis backend: the result string is
//! assembled from random choices so polling clients see plausible, varied
//! output. Clause structure is fixed — base phrase, area clause, optional
//! title-length clause, score — joined with comma separators.

use rand::seq::SliceRandom;
use rand::Rng;

const BASE_PHRASES: [&str; 8] = [
    "voice recognition succeeded",
    "voice quality is good",
    "pitch is accurate",
    "pronunciation is clear",
    "speaking rate is moderate",
    "volume is appropriate",
    "voice test passed",
    "pronunciation is standard",
];

/// Build a simulated test result for the given phrase and voice area.
///
/// Areas `"1"` through `"4"` each choose between two fixed adjectives; any
/// other area value gets a generic clause, never an error. A non-empty
/// `title` adds a length-based clause (more than ten characters counts as a
/// long sentence). The score is a random integer in 75–99.
#[must_use]
pub fn synthesize_result(title: &str, area: &str) -> String {
    let mut rng = rand::thread_rng();

    let base = BASE_PHRASES
        .choose(&mut rng)
        .copied()
        .unwrap_or(BASE_PHRASES[0]);
    let mut result = String::from(base);

    let area_clause = match area {
        "1" => {
            if rng.gen_bool(0.5) {
                "area 1 presence excellent"
            } else {
                "area 1 presence good"
            }
        }
        "2" => {
            if rng.gen_bool(0.5) {
                "area 2 steady and accurate"
            } else {
                "area 2 steady and clear"
            }
        }
        "3" => {
            if rng.gen_bool(0.5) {
                "area 3 rich and forceful"
            } else {
                "area 3 rich and full"
            }
        }
        "4" => {
            if rng.gen_bool(0.5) {
                "area 4 blend coordinated"
            } else {
                "area 4 blend balanced"
            }
        }
        _ => "overall performance good",
    };
    result.push_str(", ");
    result.push_str(area_clause);

    if !title.is_empty() {
        if title.chars().count() > 10 {
            result.push_str(", handles long sentences well");
        } else {
            result.push_str(", clear short-sentence pronunciation");
        }
    }

    let score: u32 = rng.gen_range(75..100);
    result.push_str(&format!(", score: {score}"));

    result
}
