//! N-best segment Viterbi over an [`Automaton`] and an [`Observation`].
//!
//! A path visits a strictly increasing set of columns starting at column 0
//! and ending at the last column. Every hop `ts -> t` along a transition
//! scores the transition weight, the edge collection evaluated on the
//! position gap (and the content scores of the segment), an optional
//! segment loss and the emission of the destination state at `t`.

pub(crate) mod cost;
mod free;
mod loss;
pub(crate) mod nbest;
mod orf;
#[cfg(test)]
mod tests;

pub use free::{decode_free_length, FreePath};
pub use loss::{LossAugmentation, SegmentIdMask, SegmentLoss};
pub(crate) use loss::LossWindow;

use serde::Serialize;
use tracing::{debug, debug_span, info};

use crate::error::{ModelError, Result};
use crate::model::{Automaton, ContentScores};
use crate::observation::Observation;
use crate::settings::settings;

use cost::{emission_table, PenaltyCost, SegmentCost, ZeroPenaltyCost};
use nbest::{admissible, backtrace, insert_top_k, KEntry};
use orf::OrfScan;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    pub nbest: usize,
    /// Reject segments whose open reading frame contains a stop codon.
    pub use_orf: bool,
    pub loss: Option<LossAugmentation>,
    /// Look-back of transitions without an edge penalty.
    pub default_look_back: i32,
    /// Emissions at or below this mark a column dead for a state.
    pub unobservable_threshold: f64,
}

/// Tunables start from `decoder.*` in the settings.
impl Default for DecodeOptions {
    fn default() -> Self {
        let s = &settings().decoder;
        Self {
            nbest: 1,
            use_orf: false,
            loss: None,
            default_look_back: s.default_look_back,
            unobservable_threshold: s.unobservable_threshold,
        }
    }
}

impl DecodeOptions {
    pub fn nbest(nbest: usize) -> Self {
        Self {
            nbest,
            ..Self::default()
        }
    }
}

/// One decode result. `positions` are column indices into the observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathHypothesis {
    pub score: f64,
    pub states: Vec<usize>,
    pub positions: Vec<usize>,
}

/// Run the full decoder and return up to `nbest` paths, best first.
///
/// Fewer paths come back when fewer than `nbest` finite-scoring paths
/// exist.
pub fn decode(model: &Automaton, obs: &Observation, opts: &DecodeOptions) -> Result<Vec<PathHypothesis>> {
    let cost = PenaltyCost::new(model);
    run(model, obs, opts, &cost)
}

/// Same search with every penalty collection fixed at 0.
pub fn decode_without_content(
    model: &Automaton,
    obs: &Observation,
    opts: &DecodeOptions,
) -> Result<Vec<PathHypothesis>> {
    run(model, obs, opts, &ZeroPenaltyCost)
}

pub(crate) fn check_nbest(nbest: usize) -> Result<()> {
    let max = settings().decoder.max_nbest;
    if nbest == 0 || nbest > max {
        return Err(ModelError::InvalidNbest { nbest, max });
    }
    Ok(())
}

/// Checks shared by the decoder and the gradient engine.
pub(crate) fn check_observation(model: &Automaton, obs: &Observation) -> Result<()> {
    if obs.has_signals() {
        if obs.signal_states() != model.n_states() {
            return Err(ModelError::dims(
                "signal states",
                model.n_states(),
                obs.signal_states(),
            ));
        }
        if obs.signal_planes() < model.signal_planes() {
            return Err(ModelError::dims(
                "signal planes",
                model.signal_planes(),
                obs.signal_planes(),
            ));
        }
    } else if model.signal_planes() > 0 {
        return Err(ModelError::dims("signal planes", model.signal_planes(), 0));
    }
    Ok(())
}

fn run(
    model: &Automaton,
    obs: &Observation,
    opts: &DecodeOptions,
    cost: &dyn SegmentCost,
) -> Result<Vec<PathHypothesis>> {
    let n = model.n_states();
    let m = obs.len();
    let k = opts.nbest;
    let _span = debug_span!("decode", n_states = n, columns = m, nbest = k).entered();

    check_nbest(k)?;
    if opts.default_look_back < 0 {
        return Err(ModelError::InvalidLookBack(opts.default_look_back));
    }
    check_observation(model, obs)?;
    if let Some(aug) = &opts.loss {
        aug.validate(model.max_segment_id(), m)?;
    }
    let stops = if opts.use_orf && model.has_orf_constraints() {
        Some(obs.stop_codons()?)
    } else {
        None
    };
    let mut content = match model.content() {
        Some(c) if cost.needs_content() => {
            Some((c, obs.kmer_index(c.degrees())?, ContentScores::new(c)))
        }
        _ => None,
    };

    let max_look_back = model.max_look_back(opts.default_look_back);
    if m > settings().decoder.big_sequence_len {
        let cells = (m * n * k) as f64;
        let mb = cells * (std::mem::size_of::<KEntry>() as f64) / (1024.0 * 1024.0);
        info!(columns = m, n_states = n, nbest = k, max_look_back, estimated_mb = mb, "large decode");
    }

    let emissions = emission_table(cost, model, obs);
    let em = |state: usize, column: usize| emissions[state * m + column];
    let positions = obs.positions();

    let mut table: Vec<Vec<KEntry>> = vec![Vec::new(); m * n];
    for state in 0..n {
        let score = model.p()[state] + em(state, 0);
        if admissible(score) {
            table[state].push(KEntry::start(score));
        }
    }

    let mut loss_window = opts.loss.as_ref().map(|_| LossWindow::new(model.max_segment_id() + 1));

    for t in 1..m {
        if let Some((c, index, scores)) = content.as_mut() {
            scores.fill(c, index, positions, t, max_look_back);
        }
        if let (Some(w), Some(aug)) = (loss_window.as_mut(), opts.loss.as_ref()) {
            w.fill(&aug.mask, positions, t, max_look_back);
        }

        for j in 0..n {
            if em(j, t) <= opts.unobservable_threshold {
                continue;
            }
            let mut list: Vec<KEntry> = Vec::with_capacity(k);
            for &ti in model.incoming(j) {
                let tr = model.transition(ti);
                let look_back = model.look_back(tr.src, j, opts.default_look_back);
                let orf = model.orf_span(ti);
                let mut scan = match (orf, stops.as_deref()) {
                    (Some(span), Some(stops)) => Some(OrfScan::new(stops, span.to, positions[t])),
                    _ => None,
                };

                for ts in (0..t).rev() {
                    let gap = positions[t] - positions[ts];
                    if gap > look_back {
                        break;
                    }
                    if let Some(span) = orf {
                        if positions[ts] < 0 || gap % 3 != span.target {
                            continue;
                        }
                        if let Some(scan) = scan.as_mut() {
                            if !scan.extend(positions[ts]) {
                                break;
                            }
                        }
                    }
                    let prev = &table[ts * n + tr.src];
                    if prev.is_empty() {
                        continue;
                    }

                    let scores: &[f64] = match &content {
                        Some((_, _, scores)) => scores.get(t - ts),
                        None => &[],
                    };
                    let segment_loss = match (&loss_window, &opts.loss) {
                        (Some(w), Some(aug)) => w.loss(ts, tr.segment_id, &aug.loss),
                        _ => 0.0,
                    };
                    let step = tr.weight + cost.edge_penalty(tr.src, j, gap, scores) + segment_loss;

                    for (rank, entry) in prev.iter().enumerate() {
                        let score = entry.score + step;
                        if !admissible(score) {
                            continue;
                        }
                        insert_top_k(
                            &mut list,
                            k,
                            KEntry {
                                score,
                                prev: Some((ts, tr.src)),
                                prev_rank: rank,
                            },
                        );
                    }
                }
            }

            let e = em(j, t);
            list.retain_mut(|entry| {
                entry.score += e;
                admissible(entry.score)
            });
            table[t * n + j] = list;
        }
    }

    // Termination
    let last = m - 1;
    let mut ends: Vec<KEntry> = Vec::with_capacity(k);
    for state in 0..n {
        for (rank, entry) in table[last * n + state].iter().enumerate() {
            let score = entry.score + model.q()[state];
            if admissible(score) {
                insert_top_k(
                    &mut ends,
                    k,
                    KEntry {
                        score,
                        prev: Some((last, state)),
                        prev_rank: rank,
                    },
                );
            }
        }
    }

    let results: Vec<PathHypothesis> = ends
        .iter()
        .filter_map(|end| {
            let (column, state) = end.prev?;
            let (states, positions) = backtrace(&table, n, column, state, end.prev_rank);
            Some(PathHypothesis {
                score: end.score,
                states,
                positions,
            })
        })
        .collect();

    debug!(
        result_count = results.len(),
        best_score = results.first().map(|p| p.score)
    );
    Ok(results)
}
