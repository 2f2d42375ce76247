//! Automaton model: states, initial/final scores, sparse weighted
//! transitions and the penalty collections attached to edges and state
//! signal planes.
//!
//! An [`Automaton`] is built once through [`AutomatonBuilder`], which checks
//! every dimension and id up front. It owns its [`PlifArena`] and is
//! immutable afterwards.

mod content;
#[cfg(test)]
mod tests;

pub use content::{ContentModel, KmerIndex, WordFrame, MAX_WORD_DEGREE};
pub(crate) use content::ContentScores;

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::plif::{PenaltyCollection, PlifArena};

/// Sentinel frame value meaning "no reading frame".
pub const NO_FRAME: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transition {
    pub src: usize,
    pub dst: usize,
    pub weight: f64,
    /// Segment label used by loss-augmented decoding.
    #[serde(default)]
    pub segment_id: usize,
}

impl Transition {
    pub fn new(src: usize, dst: usize, weight: f64) -> Self {
        Self {
            src,
            dst,
            weight,
            segment_id: 0,
        }
    }

    pub fn with_segment(mut self, segment_id: usize) -> Self {
        self.segment_id = segment_id;
        self
    }
}

/// Reading-frame annotation of a state: the frame a segment leaving the
/// state starts in and the frame a segment entering it ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrfFrames {
    pub from: i32,
    pub to: i32,
}

/// Reading-frame constraint of one transition, resolved at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OrfSpan {
    /// End frame of the destination state.
    pub to: i32,
    /// Required `gap % 3`.
    pub target: i32,
}

#[derive(Debug, Clone)]
pub struct Automaton {
    n_states: usize,
    p: Vec<f64>,
    q: Vec<f64>,
    transitions: Vec<Transition>,
    /// Transition indices grouped by destination, sorted by source.
    incoming: Vec<Vec<usize>>,
    /// Dense `[src * n + dst]` weights, `-inf` where no transition exists.
    dense: Vec<f64>,
    /// Dense `[src * n + dst]` edge collections.
    edge_penalties: Vec<PenaltyCollection>,
    /// `[state][plane]` state-signal collections.
    state_signals: Vec<Vec<PenaltyCollection>>,
    signal_planes: usize,
    orf: Vec<Option<OrfFrames>>,
    /// Per transition, parallel to `transitions`.
    orf_spans: Vec<Option<OrfSpan>>,
    content: Option<ContentModel>,
    plifs: PlifArena,
}

impl Automaton {
    pub fn builder(n_states: usize, plifs: PlifArena) -> AutomatonBuilder {
        AutomatonBuilder {
            n_states,
            plifs,
            p: None,
            q: None,
            transitions: Vec::new(),
            edge_penalties: Vec::new(),
            state_signals: Vec::new(),
            signal_planes: 0,
            orf: Vec::new(),
            content: None,
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transition(&self, index: usize) -> &Transition {
        &self.transitions[index]
    }

    /// Indices of the transitions entering `dst`, in ascending source order.
    pub fn incoming(&self, dst: usize) -> &[usize] {
        &self.incoming[dst]
    }

    /// Weight of `src -> dst`, `-inf` when the automaton has no such edge.
    pub fn transition_weight(&self, src: usize, dst: usize) -> f64 {
        self.dense[src * self.n_states + dst]
    }

    pub fn find_transition(&self, src: usize, dst: usize) -> Option<usize> {
        self.incoming
            .get(dst)?
            .iter()
            .copied()
            .find(|&i| self.transitions[i].src == src)
    }

    pub fn edge_penalty(&self, src: usize, dst: usize) -> &PenaltyCollection {
        &self.edge_penalties[src * self.n_states + dst]
    }

    pub fn state_signals(&self, state: usize) -> &[PenaltyCollection] {
        &self.state_signals[state]
    }

    pub fn signal_planes(&self) -> usize {
        self.signal_planes
    }

    pub fn orf_frames(&self, state: usize) -> Option<OrfFrames> {
        self.orf[state]
    }

    pub(crate) fn orf_span(&self, transition: usize) -> Option<OrfSpan> {
        self.orf_spans[transition]
    }

    pub fn has_orf_constraints(&self) -> bool {
        self.orf_spans.iter().any(Option::is_some)
    }

    pub fn content(&self) -> Option<&ContentModel> {
        self.content.as_ref()
    }

    pub fn plifs(&self) -> &PlifArena {
        &self.plifs
    }

    /// Largest segment id carried by any transition.
    pub fn max_segment_id(&self) -> usize {
        self.transitions
            .iter()
            .map(|t| t.segment_id)
            .max()
            .unwrap_or(0)
    }

    /// Whether any edge collection reads content scores.
    pub fn uses_content_scores(&self) -> bool {
        self.edge_penalties
            .iter()
            .any(|c| c.uses_external_scores(&self.plifs))
    }

    /// Look-back bound of the edge `src -> dst`: the ceiling of its
    /// collection's `max_value`, or `default` when the edge has none.
    pub fn look_back(&self, src: usize, dst: usize, default: i32) -> i32 {
        match self.edge_penalty(src, dst).max_value(&self.plifs) {
            Some(v) => v.ceil() as i32,
            None => default,
        }
    }

    /// Largest look-back over all transitions.
    pub fn max_look_back(&self, default: i32) -> i32 {
        self.transitions
            .iter()
            .map(|t| self.look_back(t.src, t.dst, default))
            .max()
            .unwrap_or(0)
    }
}

pub struct AutomatonBuilder {
    n_states: usize,
    plifs: PlifArena,
    p: Option<Vec<f64>>,
    q: Option<Vec<f64>>,
    transitions: Vec<Transition>,
    edge_penalties: Vec<(usize, usize, PenaltyCollection)>,
    state_signals: Vec<(usize, usize, PenaltyCollection)>,
    signal_planes: usize,
    orf: Vec<(usize, OrfFrames)>,
    content: Option<ContentModel>,
}

impl AutomatonBuilder {
    pub fn initial(mut self, p: Vec<f64>) -> Self {
        self.p = Some(p);
        self
    }

    pub fn terminal(mut self, q: Vec<f64>) -> Self {
        self.q = Some(q);
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn transitions(mut self, transitions: impl IntoIterator<Item = Transition>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn edge_penalty(mut self, src: usize, dst: usize, collection: PenaltyCollection) -> Self {
        self.edge_penalties.push((src, dst, collection));
        self
    }

    /// Number of signal planes per state and column the observation carries.
    pub fn signal_planes(mut self, planes: usize) -> Self {
        self.signal_planes = planes;
        self
    }

    pub fn state_signal(mut self, state: usize, plane: usize, collection: PenaltyCollection) -> Self {
        self.state_signals.push((state, plane, collection));
        self
    }

    /// Frames use [`NO_FRAME`] for "none"; both must be none or both set.
    pub fn orf_info(mut self, state: usize, from: i32, to: i32) -> Self {
        self.orf.push((state, OrfFrames { from, to }));
        self
    }

    pub fn content(mut self, content: ContentModel) -> Self {
        self.content = Some(content);
        self
    }

    pub fn build(self) -> Result<Automaton> {
        let n = self.n_states;
        if n == 0 {
            return Err(ModelError::dims("number of states", 1, 0));
        }
        let p = self.p.unwrap_or_else(|| vec![0.0; n]);
        let q = self.q.unwrap_or_else(|| vec![0.0; n]);
        if p.len() != n {
            return Err(ModelError::dims("initial scores", n, p.len()));
        }
        if q.len() != n {
            return Err(ModelError::dims("final scores", n, q.len()));
        }

        let mut dense = vec![f64::NEG_INFINITY; n * n];
        let mut present = vec![false; n * n];
        for t in &self.transitions {
            if t.src >= n {
                return Err(ModelError::out_of_range("transition source", t.src, n));
            }
            if t.dst >= n {
                return Err(ModelError::out_of_range("transition destination", t.dst, n));
            }
            let cell = t.src * n + t.dst;
            if std::mem::replace(&mut present[cell], true) {
                return Err(ModelError::DuplicateTransition {
                    src: t.src,
                    dst: t.dst,
                });
            }
            dense[cell] = t.weight;
        }

        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, t) in self.transitions.iter().enumerate() {
            incoming[t.dst].push(i);
        }
        for list in &mut incoming {
            list.sort_by_key(|&i| self.transitions[i].src);
        }

        let mut edge_penalties = vec![PenaltyCollection::Empty; n * n];
        for (src, dst, collection) in self.edge_penalties {
            if src >= n {
                return Err(ModelError::out_of_range("edge penalty source", src, n));
            }
            if dst >= n {
                return Err(ModelError::out_of_range("edge penalty destination", dst, n));
            }
            check_collection(&collection, &self.plifs)?;
            edge_penalties[src * n + dst] = collection;
        }

        let planes = self.signal_planes;
        let mut state_signals = vec![vec![PenaltyCollection::Empty; planes]; n];
        for (state, plane, collection) in self.state_signals {
            if state >= n {
                return Err(ModelError::out_of_range("state signal state", state, n));
            }
            if plane >= planes {
                return Err(ModelError::out_of_range("state signal plane", plane, planes));
            }
            check_collection(&collection, &self.plifs)?;
            state_signals[state][plane] = collection;
        }

        let mut orf = vec![None; n];
        for (state, frames) in self.orf {
            if state >= n {
                return Err(ModelError::out_of_range("orf state", state, n));
            }
            for frame in [frames.from, frames.to] {
                if !(NO_FRAME..=2).contains(&frame) {
                    return Err(ModelError::InvalidFrame { state, frame });
                }
            }
            orf[state] = Some(frames);
        }
        let mut orf_spans = Vec::with_capacity(self.transitions.len());
        for t in &self.transitions {
            let from = orf[t.src].map_or(NO_FRAME, |f| f.from);
            let to = orf[t.dst].map_or(NO_FRAME, |f| f.to);
            orf_spans.push(match (from, to) {
                (NO_FRAME, NO_FRAME) => None,
                (NO_FRAME, _) | (_, NO_FRAME) => {
                    return Err(ModelError::OrfMismatch {
                        src: t.src,
                        dst: t.dst,
                    })
                }
                (from, to) => Some(OrfSpan {
                    to,
                    target: (to - from).rem_euclid(3),
                }),
            });
        }

        let num_scores = self.content.as_ref().map_or(0, |c| c.num_scores());
        for collection in &edge_penalties {
            if let Some(idx) = collection.max_external_index(&self.plifs) {
                if idx > num_scores {
                    return Err(ModelError::out_of_range(
                        "content score index (one-based)",
                        idx,
                        num_scores + 1,
                    ));
                }
            }
        }

        debug!(
            n_states = n,
            transitions = self.transitions.len(),
            functions = self.plifs.len(),
            signal_planes = planes,
            content_scores = num_scores,
        );

        Ok(Automaton {
            n_states: n,
            p,
            q,
            transitions: self.transitions,
            incoming,
            dense,
            edge_penalties,
            state_signals,
            signal_planes: planes,
            orf,
            orf_spans,
            content: self.content,
            plifs: self.plifs,
        })
    }
}

fn check_collection(collection: &PenaltyCollection, plifs: &PlifArena) -> Result<()> {
    for id in collection.ids() {
        if id.0 >= plifs.len() {
            return Err(ModelError::out_of_range("penalty function", id.0, plifs.len()));
        }
    }
    Ok(())
}
