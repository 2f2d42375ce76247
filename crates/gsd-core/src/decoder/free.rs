use serde::Serialize;
use tracing::{debug, debug_span};

use super::check_nbest;
use super::nbest::{admissible, backtrace, insert_top_k, KEntry};
use crate::error::{ModelError, Result};
use crate::model::Automaton;
use crate::settings::settings;

/// A state sequence of any length, scored `p + Σ weights + q`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreePath {
    pub score: f64,
    pub states: Vec<usize>,
}

/// Best state sequences of `2..=max_iter` states over the transition
/// weights alone, no observation involved.
///
/// Each step extends every kept path by one transition; the `nbest` best
/// terminated paths across all lengths are returned, best first.
/// `max_iter` is capped by `decoder.max_iterations`.
pub fn decode_free_length(model: &Automaton, max_iter: i64, nbest: usize) -> Result<Vec<FreePath>> {
    let max = settings().decoder.max_iterations;
    let invalid = || ModelError::InvalidIterations { max_iter, max };
    let steps = usize::try_from(max_iter).map_err(|_| invalid())?;
    if !(2..=max).contains(&steps) {
        return Err(invalid());
    }
    check_nbest(nbest)?;
    let n = model.n_states();
    let cells = steps.checked_mul(n).ok_or_else(invalid)?;
    let _span = debug_span!("decode_free_length", n_states = n, max_iter, nbest).entered();

    let mut table: Vec<Vec<KEntry>> = vec![Vec::new(); cells];
    for state in 0..n {
        let p = model.p()[state];
        if admissible(p) {
            table[state].push(KEntry::start(p));
        }
    }

    let mut ends: Vec<KEntry> = Vec::with_capacity(nbest);
    for t in 1..steps {
        for j in 0..n {
            let mut list = Vec::with_capacity(nbest);
            for &ti in model.incoming(j) {
                let tr = model.transition(ti);
                for (rank, entry) in table[(t - 1) * n + tr.src].iter().enumerate() {
                    let score = entry.score + tr.weight;
                    if admissible(score) {
                        insert_top_k(
                            &mut list,
                            nbest,
                            KEntry {
                                score,
                                prev: Some((t - 1, tr.src)),
                                prev_rank: rank,
                            },
                        );
                    }
                }
            }
            table[t * n + j] = list;
        }

        for state in 0..n {
            for (rank, entry) in table[t * n + state].iter().enumerate() {
                let score = entry.score + model.q()[state];
                if admissible(score) {
                    insert_top_k(
                        &mut ends,
                        nbest,
                        KEntry {
                            score,
                            prev: Some((t, state)),
                            prev_rank: rank,
                        },
                    );
                }
            }
        }
    }

    let results: Vec<FreePath> = ends
        .iter()
        .filter_map(|end| {
            let (t, state) = end.prev?;
            let (states, _) = backtrace(&table, n, t, state, end.prev_rank);
            Some(FreePath {
                score: end.score,
                states,
            })
        })
        .collect();

    debug!(
        result_count = results.len(),
        best_score = results.first().map(|p| p.score),
        longest = results.iter().map(|p| p.states.len()).max()
    );
    Ok(results)
}
