use crate::model::Automaton;
use crate::observation::Observation;
use crate::plif::PenaltyCollection;

/// Trait for scoring segments and state signals during decoding.
pub(crate) trait SegmentCost {
    /// Penalty of a segment of length `len` on the edge `src -> dst`.
    fn edge_penalty(&self, src: usize, dst: usize, len: i32, content: &[f64]) -> f64;
    /// Contribution of one signal plane value through its collection.
    fn signal(&self, collection: &PenaltyCollection, raw: f64) -> f64;
    /// Whether `edge_penalty` reads content scores.
    fn needs_content(&self) -> bool;
}

/// Evaluates every collection of the model.
pub(crate) struct PenaltyCost<'a> {
    model: &'a Automaton,
    needs_content: bool,
}

impl<'a> PenaltyCost<'a> {
    pub fn new(model: &'a Automaton) -> Self {
        Self {
            model,
            needs_content: model.uses_content_scores(),
        }
    }
}

impl SegmentCost for PenaltyCost<'_> {
    fn edge_penalty(&self, src: usize, dst: usize, len: i32, content: &[f64]) -> f64 {
        self.model
            .edge_penalty(src, dst)
            .evaluate_len(self.model.plifs(), len, content, true)
    }

    fn signal(&self, collection: &PenaltyCollection, raw: f64) -> f64 {
        collection.evaluate(self.model.plifs(), raw, &[], true)
    }

    fn needs_content(&self) -> bool {
        self.needs_content
    }
}

/// Every collection fixed at 0: transition weights and raw signals only.
pub(crate) struct ZeroPenaltyCost;

impl SegmentCost for ZeroPenaltyCost {
    fn edge_penalty(&self, _src: usize, _dst: usize, _len: i32, _content: &[f64]) -> f64 {
        0.0
    }

    fn signal(&self, _collection: &PenaltyCollection, _raw: f64) -> f64 {
        0.0
    }

    fn needs_content(&self) -> bool {
        false
    }
}

/// Emission of `state` at `column`.
///
/// Plane 0 without a collection passes its raw value through. Otherwise
/// planes are summed through their collections up to the first plane
/// without one. A non-finite raw value replaces the sum.
pub(crate) fn emission(
    cost: &dyn SegmentCost,
    model: &Automaton,
    obs: &Observation,
    state: usize,
    column: usize,
) -> f64 {
    let signals = model.state_signals(state);
    let mut value = 0.0;
    for plane in 0..obs.signal_planes() {
        let raw = obs.signal(state, column, plane);
        match signals.get(plane) {
            Some(c) if !c.is_empty() => {
                if raw.is_finite() {
                    value += cost.signal(c, raw);
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

/// Emission table `[state * columns + column]`.
pub(crate) fn emission_table(cost: &dyn SegmentCost, model: &Automaton, obs: &Observation) -> Vec<f64> {
    let m = obs.len();
    let mut table = vec![0.0; model.n_states() * m];
    if !obs.has_signals() {
        return table;
    }
    for state in 0..model.n_states() {
        for column in 0..m {
            table[state * m + column] = emission(cost, model, obs, state, column);
        }
    }
    table
}
