/// Solver verdict extraction: scan decomposer output for the achieved
/// width and the correctness verdict.
///
/// BalancedGo writes, somewhere in its output, lines like:
/// - `Width: 4`
/// - `Correct: true`
use regex::Regex;
use std::sync::LazyLock;

/// Compiled patterns for the two labels the solver reports.
static WIDTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Width:\s+(\d+)").unwrap());
static CORRECT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Correct:\s+(\S+)").unwrap());

/// Structured verdict of one completed decomposition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverReport {
    /// Whether the solver certified its layout as correct.
    pub correct: bool,
    /// The width the solver reports it achieved (0 if never reported).
    pub width: u64,
}

/// Extract the solver's verdict from its raw output.
///
/// Scans line by line; when a label matches on a later line the later
/// value overwrites the earlier one. A missing `Correct:` label or any
/// token other than exactly `true` counts as incorrect, and a missing
/// width defaults to 0 — malformed output never errors, it degrades to
/// a failed attempt.
pub fn parse_report(text: &str) -> SolverReport {
    let mut width = 0u64;
    let mut correct = false;

    for line in text.lines() {
        if let Some(caps) = WIDTH_PATTERN.captures(line) {
            if let Ok(w) = caps[1].parse::<u64>() {
                width = w;
            }
        }
        if let Some(caps) = CORRECT_PATTERN.captures(line) {
            correct = &caps[1] == "true";
        }
    }

    SolverReport { correct, width }
}
