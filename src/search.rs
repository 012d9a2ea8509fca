/// The narrowing search: run solver attempts at decreasing widths until
/// one fails or outruns its deadline.
///
/// Each iteration races exactly one attempt against exactly one
/// watchdog; the width only changes between iterations, after an
/// attempt has fully completed.
use crate::config::DriverConfig;
use crate::report::parse_report;
use crate::solver::{Attempt, AttemptError};
use crate::watchdog::Watchdog;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Errors that abort the search before it can produce an answer.
#[derive(Debug)]
pub enum SearchError {
    /// Failed to read the hypergraph file.
    Graph {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The solver could not be run.
    Attempt(AttemptError),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchError::Graph { path, source } => {
                write!(f, "failed to read graph {}: {}", path.display(), source)
            }
            SearchError::Attempt(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SearchError::Graph { source, .. } => Some(source),
            SearchError::Attempt(e) => Some(e),
        }
    }
}

impl From<AttemptError> for SearchError {
    fn from(e: AttemptError) -> Self {
        SearchError::Attempt(e)
    }
}

/// Which terminal path ended the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// An attempt outran its deadline and was killed.
    Timeout,
    /// The solver reported the attempt incorrect (or said nothing usable).
    Incorrect,
    /// The iteration cap tripped before the solver gave up.
    IterationCap,
}

/// Terminal state of a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// The minimal certified width, the one answer the tool prints.
    pub width: u64,
    pub reason: StopReason,
    /// Attempts actually launched.
    pub iterations: u32,
}

/// Starting width: half the number of edge records, rounded up.
///
/// The record count is the only property of the graph file the search
/// depends on; the format itself is the solver's business.
pub fn initial_width(graph: &Path) -> Result<u64, SearchError> {
    let file = std::fs::File::open(graph).map_err(|e| SearchError::Graph {
        path: graph.to_path_buf(),
        source: e,
    })?;
    let records = std::io::BufReader::new(file).lines().count() as u64;
    Ok(records.div_ceil(2))
}

/// Drive the search to termination and return the answer.
///
/// Per iteration: spawn one attempt and one watchdog, race them. If the
/// watchdog expires first, the attempt's process group is killed and
/// the current width plus one is the answer. If the attempt finishes
/// first, the watchdog is cancelled (wind-down bounded by one tick) and
/// its output decides: a correct report narrows the width to one below
/// the solver's own figure; anything else terminates with the current
/// width plus one.
pub async fn run_search(config: &DriverConfig, graph: &Path) -> Result<SearchOutcome, SearchError> {
    let mut width = initial_width(graph)?;
    tracing::info!(width, graph = %graph.display(), "search starting");

    let mut iterations = 0u32;
    loop {
        if iterations >= config.search.max_iterations {
            // Safeguard: a solver that keeps certifying without lowering
            // its reported width would otherwise never terminate.
            tracing::warn!(
                width,
                cap = config.search.max_iterations,
                "iteration cap reached before the solver gave up"
            );
            return Ok(SearchOutcome {
                width: width + 1,
                reason: StopReason::IterationCap,
                iterations,
            });
        }
        iterations += 1;

        let mut attempt = Attempt::spawn(&config.solver, width, graph)?;
        let mut watchdog = Watchdog::spawn(
            config.watchdog.budget_ticks,
            config.watchdog.tick_interval(),
        );

        tokio::select! {
            raw = attempt.wait() => {
                watchdog.cancel();
                watchdog.outcome().await;

                let raw = raw?;
                let report = parse_report(&String::from_utf8_lossy(&raw));
                tracing::debug!(
                    width,
                    correct = report.correct,
                    reported = report.width,
                    iterations,
                    "attempt evaluated"
                );

                if report.correct {
                    width = report.width.saturating_sub(1);
                } else {
                    return Ok(SearchOutcome {
                        width: width + 1,
                        reason: StopReason::Incorrect,
                        iterations,
                    });
                }
            }
            // Only expiry can resolve here: cancellation is requested
            // solely on the other branch.
            _ = watchdog.outcome() => {
                attempt.kill();
                let _ = attempt.wait().await; // reap the killed child
                return Ok(SearchOutcome {
                    width: width + 1,
                    reason: StopReason::Timeout,
                    iterations,
                });
            }
        }
    }
}
