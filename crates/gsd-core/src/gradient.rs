//! Derivatives of a realized path's score for parameter learning.
//!
//! Re-walks one path hop by hop and accumulates how often each parameter
//! was used: breakpoint values of every penalty function involved, the
//! initial and final score of the end states and every transition weight.

use serde::Serialize;
use tracing::{debug, debug_span};

use crate::decoder::{check_observation, LossAugmentation, LossWindow, PathHypothesis};
use crate::error::{ModelError, Result};
use crate::model::{Automaton, ContentScores};
use crate::observation::Observation;
use crate::plif::PlifDerivatives;
use crate::settings::settings;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathGradient {
    pub plif: PlifDerivatives,
    pub p: Vec<f64>,
    pub q: Vec<f64>,
    /// `[src * n_states + dst]`.
    pub a: Vec<f64>,
    /// Score contributed by each hop; the first entry also holds `p` and the
    /// first emission, the last entry `q`.
    pub scores: Vec<f64>,
    /// Segment loss of each hop against the reference mask.
    pub losses: Vec<f64>,
}

impl PathGradient {
    pub fn total_score(&self) -> f64 {
        self.scores.iter().sum()
    }

    pub fn total_loss(&self) -> f64 {
        self.losses.iter().sum()
    }
}

/// Walk `path` (states and column indices) and accumulate derivatives.
///
/// `total_score()` of the result equals the decoder's score of the same
/// path without loss augmentation.
pub fn path_gradient(
    model: &Automaton,
    obs: &Observation,
    path: &PathHypothesis,
    loss: Option<&LossAugmentation>,
) -> Result<PathGradient> {
    let n = model.n_states();
    let len = path.states.len();
    let _span = debug_span!("path_gradient", n_states = n, path_len = len).entered();

    check_path(model, obs, path)?;
    check_observation(model, obs)?;
    if let Some(aug) = loss {
        aug.validate(model.max_segment_id(), obs.len())?;
    }

    let plifs = model.plifs();
    let positions = obs.positions();
    let mut grad = PathGradient {
        plif: PlifDerivatives::for_arena(plifs),
        p: vec![0.0; n],
        q: vec![0.0; n],
        a: vec![0.0; n * n],
        scores: vec![0.0; len],
        losses: vec![0.0; len],
    };

    let first = path.states[0];
    let last = path.states[len - 1];
    grad.p[first] += 1.0;
    grad.scores[0] += model.p()[first] + emission_with_derivative(model, obs, first, path.positions[0], &mut grad.plif);
    grad.q[last] += 1.0;
    grad.scores[len - 1] += model.q()[last];

    let mut content = match model.content() {
        Some(c) if model.uses_content_scores() => {
            Some((c, obs.kmer_index(c.degrees())?, ContentScores::new(c)))
        }
        _ => None,
    };
    let mut window = loss.map(|_| LossWindow::new(model.max_segment_id() + 1));
    let margin = settings().gradient.loss_lookback_margin;

    for i in 0..len - 1 {
        let (from, to) = (path.states[i], path.states[i + 1]);
        let (from_col, to_col) = (path.positions[i], path.positions[i + 1]);
        let gap = positions[to_col] - positions[from_col];
        let ti = model
            .find_transition(from, to)
            .ok_or_else(|| ModelError::InvalidPath(format!("no transition {from}->{to} at hop {i}")))?;
        let tr = model.transition(ti);

        if let (Some(w), Some(aug)) = (window.as_mut(), loss) {
            w.fill(&aug.mask, positions, to_col, gap.saturating_add(margin));
            grad.losses[i] = w.loss(from_col, tr.segment_id, &aug.loss);
        }

        grad.a[from * n + to] += 1.0;
        grad.scores[i] += tr.weight;

        let scores: &[f64] = match content.as_mut() {
            Some((c, index, scores)) => {
                scores.fill(c, index, positions, to_col, gap);
                scores.get(to_col - from_col)
            }
            None => &[],
        };
        let edge = model.edge_penalty(from, to);
        grad.scores[i] += edge.evaluate_len(plifs, gap, scores, true);
        edge.add_derivative(plifs, gap as f64, scores, true, &mut grad.plif);

        grad.scores[i] += emission_with_derivative(model, obs, to, to_col, &mut grad.plif);
    }

    debug!(
        total_score = grad.total_score(),
        total_loss = grad.total_loss()
    );
    Ok(grad)
}

fn check_path(model: &Automaton, obs: &Observation, path: &PathHypothesis) -> Result<()> {
    let len = path.states.len();
    if len == 0 {
        return Err(ModelError::InvalidPath("empty path".to_string()));
    }
    if path.positions.len() != len {
        return Err(ModelError::dims("path positions", len, path.positions.len()));
    }
    if let Some(&s) = path.states.iter().find(|&&s| s >= model.n_states()) {
        return Err(ModelError::out_of_range("path state", s, model.n_states()));
    }
    if let Some(&c) = path.positions.iter().find(|&&c| c >= obs.len()) {
        return Err(ModelError::out_of_range("path column", c, obs.len()));
    }
    if let Some(i) = path.positions.windows(2).position(|w| w[1] <= w[0]) {
        return Err(ModelError::InvalidPath(format!(
            "columns not strictly increasing at hop {i}"
        )));
    }
    Ok(())
}

/// Emission of `state` at `column`, accumulating the derivative of every
/// state-signal function that contributed.
fn emission_with_derivative(
    model: &Automaton,
    obs: &Observation,
    state: usize,
    column: usize,
    out: &mut PlifDerivatives,
) -> f64 {
    let plifs = model.plifs();
    let signals = model.state_signals(state);
    let mut value = 0.0;
    for plane in 0..obs.signal_planes() {
        let raw = obs.signal(state, column, plane);
        match signals.get(plane) {
            Some(c) if !c.is_empty() => {
                if raw.is_finite() {
                    value += c.evaluate(plifs, raw, &[], true);
                    c.add_derivative(plifs, raw, &[], true, out);
                } else {
                    value = raw;
                }
            }
            _ => {
                if plane == 0 {
                    value = raw;
                }
                break;
            }
        }
    }
    value
}
