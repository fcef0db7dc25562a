//! Guess parsing
//!
//! Turns raw learner input into a canonical shape for comparison.

use crate::config::TonalityMode;
use crate::shape::Shape;

/// Parse a guess such as `"0 4 7"` or `"4, 7"`.
///
/// Commas count as separators and non-integer tokens are dropped. Atonal
/// guesses are anchored at 0. The result is deduplicated and ascending.
/// Returns `None` when no integer is present.
pub fn parse_guess(raw: &str, tonality: TonalityMode) -> Option<Shape> {
    let mut nums: Vec<i32> = raw
        .replace(',', " ")
        .split_whitespace()
        .filter_map(|tok| tok.parse::<i32>().ok())
        .collect();

    if nums.is_empty() {
        return None;
    }

    if tonality == TonalityMode::Atonal && nums[0] != 0 {
        nums.insert(0, 0);
    }

    nums.sort_unstable();
    nums.dedup();
    Some(Shape::from(nums))
}

/// Expand octave shorthand before parsing.
///
/// Each number is raised by octaves until it exceeds the previous one, and
/// every `^` adds a further octave to the next number: `"0 4 7 4"` becomes
/// `"0 4 7 16"`, `"0 ^4"` becomes `"0 16"`. Input without numbers or carets
/// is returned unchanged.
pub fn expand_octave_notation(raw: &str) -> String {
    let mut result: Vec<i32> = Vec::new();
    let mut pending_carets = 0;
    let mut any_token = false;
    let mut digits = String::new();

    let flush = |digits: &mut String, pending: &mut i32, result: &mut Vec<i32>| {
        if digits.is_empty() {
            return;
        }
        let lifted = digits
            .parse::<i32>()
            .ok()
            .and_then(|n| lift_above(n, result.last().copied(), *pending));
        if let Some(n) = lifted {
            result.push(n);
        }
        *pending = 0;
        digits.clear();
    };

    for ch in raw.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            any_token = true;
            continue;
        }
        flush(&mut digits, &mut pending_carets, &mut result);
        if ch == '^' {
            pending_carets = pending_carets.saturating_add(1);
            any_token = true;
        }
    }
    flush(&mut digits, &mut pending_carets, &mut result);

    if !any_token {
        return raw.to_string();
    }

    result
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Smallest octave transposition of `n` above `prev`, plus `carets` octaves.
/// `None` when the result does not fit in an `i32`.
fn lift_above(n: i32, prev: Option<i32>, carets: i32) -> Option<i32> {
    let mut n = n;
    if let Some(prev) = prev {
        if n <= prev {
            let octaves = prev.checked_sub(n)? / 12 + 1;
            n = n.checked_add(octaves.checked_mul(12)?)?;
        }
    }
    n.checked_add(carets.checked_mul(12)?)
}
