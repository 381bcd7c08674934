//! Pulling the final answer out of an agent's full response

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)【答案[:：](.*?)】").unwrap());

static UNTERMINATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)【答案[:：](.*)$").unwrap());

static INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"答案[:：]([^\n，。！？；]*)").unwrap());

/// Extract the answer an agent committed to.
///
/// Agents are prompted to finish with `【答案：...】`. When they do not, the
/// closest marker is used, and failing that the last line that is not a
/// `[status]` or `(note)` line.
pub fn extract_answer(response: &str) -> String {
    if response.trim().is_empty() {
        return String::new();
    }

    for pattern in [&BRACKETED, &UNTERMINATED, &INLINE] {
        if let Some(caps) = pattern.captures(response) {
            let answer = caps[1].trim();
            if !answer.is_empty() {
                return answer.to_string();
            }
        }
    }

    response
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with('('))
        .map(String::from)
        .unwrap_or_default()
}
