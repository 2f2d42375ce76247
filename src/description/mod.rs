//! Language-agnostic model and request files.
//!
//! Hosts hand over penalty-function references as one-based ids (`0` means
//! none, `k` means function `k - 1`) and matrices packed in column-major
//! order. Everything here is converted into validated zero-based core
//! types; the core never sees either convention.
//!
//! State indices, segment ids and path columns are zero-based throughout.

mod packed;
mod score;

pub use packed::PackedMatrix;
pub use score::Score;

use serde::{Deserialize, Serialize};
use tracing::debug;

use gsd_core::{
    Automaton, ContentModel, DecodeOptions, LossAugmentation, ModelError, Observation,
    PathHypothesis, PenaltyCollection, PenaltyFunction, PlifArena, PlifId, ScoreTransform,
    SegmentIdMask, SegmentLoss, Transition, WordFrame,
};

use crate::error::EngineError;
use score::values;

/// One penalty function. `id`, `next` and `external_score` are one-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlifDescription {
    pub id: usize,
    pub limits: Vec<f64>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub transform: String,
    pub min_len: i32,
    pub max_len: i32,
    #[serde(default)]
    pub external_score: usize,
    #[serde(default)]
    pub next: usize,
    #[serde(default)]
    pub use_cache: bool,
    #[serde(default)]
    pub name: String,
}

/// Word-count content scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDescription {
    pub degrees: Vec<usize>,
    /// `[Σ 4^degree, num_scores]`.
    pub weights: PackedMatrix<f64>,
    /// `(modulus, offset)` per score.
    pub mod_words: Vec<[i32; 2]>,
    #[serde(default)]
    pub sign_words: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub n_states: usize,
    #[serde(default)]
    pub plifs: Vec<PlifDescription>,
    pub p: Vec<Score>,
    pub q: Vec<Score>,
    /// Rows `[src, dst, weight]` or `[src, dst, weight, segment_id]`.
    pub transitions: Vec<Vec<Score>>,
    /// `[n_states (dst), n_states (src), depth]` one-based function ids.
    #[serde(default)]
    pub edge_penalties: Option<PackedMatrix<usize>>,
    /// `[n_states, planes]` one-based function ids.
    #[serde(default)]
    pub state_signals: Option<PackedMatrix<usize>>,
    /// `(from_frame, to_frame)` per state, `-1` for none.
    #[serde(default)]
    pub orf_info: Option<Vec<[i32; 2]>>,
    #[serde(default)]
    pub content: Option<ContentDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationDescription {
    pub positions: Vec<i32>,
    /// `[n_states, columns, planes]`.
    #[serde(default)]
    pub signals: Option<PackedMatrix<Score>>,
    #[serde(default)]
    pub symbols: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossDescription {
    /// `[size (true id), size (proposed id), 2]`: loss per segment, then
    /// per length unit.
    pub table: PackedMatrix<f64>,
    /// `[2, columns]`: reference segment ids, then column weights.
    pub mask: PackedMatrix<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeRequest {
    pub observation: ObservationDescription,
    #[serde(default)]
    pub nbest: Option<usize>,
    #[serde(default)]
    pub use_orf: bool,
    #[serde(default)]
    pub loss: Option<LossDescription>,
    /// Overrides `decoder.default_look_back`.
    #[serde(default)]
    pub default_look_back: Option<i32>,
}

/// A realized path: states and the observation columns they occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDescription {
    pub states: Vec<usize>,
    pub positions: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientRequest {
    pub observation: ObservationDescription,
    pub path: PathDescription,
    #[serde(default)]
    pub loss: Option<LossDescription>,
}

/// Convert a one-based reference into a function id.
pub(crate) fn plif_ref(raw: usize, len: usize, what: &str) -> Result<Option<PlifId>, EngineError> {
    match raw {
        0 => Ok(None),
        k if k <= len => Ok(Some(PlifId(k - 1))),
        k => Err(ModelError::IdOutOfRange {
            what: what.to_string(),
            id: k - 1,
            len,
        }
        .into()),
    }
}

fn index(value: f64, what: &str) -> Result<usize, EngineError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(EngineError::invalid(format!("{what} must be a non-negative integer, got {value}")))
    }
}

impl PlifDescription {
    fn to_function(&self) -> Result<PenaltyFunction, EngineError> {
        if self.id == 0 {
            return Err(EngineError::invalid(format!(
                "penalty function '{}': ids are one-based",
                self.name
            )));
        }
        let mut builder = PenaltyFunction::builder(self.id - 1, self.limits.clone(), self.values.clone())
            .name(self.name.clone())
            .transform(ScoreTransform::from_name(&self.transform))
            .len_range(self.min_len, self.max_len)
            .cached(self.use_cache);
        if self.external_score > 0 {
            builder = builder.external_score(self.external_score);
        }
        if self.next > 0 {
            builder = builder.next(self.next - 1);
        }
        Ok(builder.build()?)
    }
}

impl ContentDescription {
    fn to_content(&self) -> Result<ContentModel, EngineError> {
        self.weights.check("content weights", 2)?;
        let words = self.weights.dim(0);
        let scores = self.weights.dim(1);
        let weights = (0..scores)
            .map(|s| (0..words).map(|w| self.weights.at(&[w, s])).collect())
            .collect();
        let frames = self
            .mod_words
            .iter()
            .map(|&[modulus, offset]| WordFrame { modulus, offset })
            .collect();
        let sign_words = if self.sign_words.is_empty() {
            vec![false; scores]
        } else {
            self.sign_words.clone()
        };
        Ok(ContentModel::new(self.degrees.clone(), weights, frames, sign_words)?)
    }
}

impl ModelDescription {
    pub fn to_automaton(&self) -> Result<Automaton, EngineError> {
        let n = self.n_states;
        let functions = self
            .plifs
            .iter()
            .map(PlifDescription::to_function)
            .collect::<Result<Vec<_>, _>>()?;
        let n_plifs = functions.len();
        let arena = PlifArena::new(functions)?;

        let mut builder = Automaton::builder(n, arena)
            .initial(values(&self.p))
            .terminal(values(&self.q));

        for (row, cols) in self.transitions.iter().enumerate() {
            if !(3..=4).contains(&cols.len()) {
                return Err(EngineError::invalid(format!(
                    "transition row {row} has {} columns, expected 3 or 4",
                    cols.len()
                )));
            }
            let mut t = Transition::new(
                index(cols[0].0, "transition source")?,
                index(cols[1].0, "transition target")?,
                cols[2].0,
            );
            if let Some(id) = cols.get(3) {
                t = t.with_segment(index(id.0, "segment id")?);
            }
            builder = builder.transition(t);
        }

        if let Some(edges) = &self.edge_penalties {
            edges.check("edge penalties", 3)?;
            edges.expect_dim("edge penalties", 0, n)?;
            edges.expect_dim("edge penalties", 1, n)?;
            for src in 0..n {
                for dst in 0..n {
                    let mut ids = Vec::new();
                    for d in 0..edges.dim(2) {
                        if let Some(id) = plif_ref(edges.at(&[dst, src, d]), n_plifs, "edge penalty")? {
                            ids.push(id);
                        }
                    }
                    if !ids.is_empty() {
                        builder = builder.edge_penalty(src, dst, PenaltyCollection::from_ids(ids));
                    }
                }
            }
        }

        if let Some(signals) = &self.state_signals {
            signals.check("state signals", 2)?;
            signals.expect_dim("state signals", 0, n)?;
            let planes = signals.dim(1);
            builder = builder.signal_planes(planes);
            for state in 0..n {
                for plane in 0..planes {
                    if let Some(id) = plif_ref(signals.at(&[state, plane]), n_plifs, "state signal")? {
                        builder = builder.state_signal(state, plane, PenaltyCollection::Single(id));
                    }
                }
            }
        }

        if let Some(orf) = &self.orf_info {
            if orf.len() != n {
                return Err(ModelError::DimensionMismatch {
                    what: "orf info".to_string(),
                    expected: n,
                    actual: orf.len(),
                }
                .into());
            }
            for (state, &[from, to]) in orf.iter().enumerate() {
                builder = builder.orf_info(state, from, to);
            }
        }

        if let Some(content) = &self.content {
            builder = builder.content(content.to_content()?);
        }

        let model = builder.build()?;
        debug!(
            n_states = n,
            n_plifs,
            n_transitions = model.transitions().len(),
            "model loaded"
        );
        Ok(model)
    }
}

impl ObservationDescription {
    pub fn to_observation(&self) -> Result<Observation, EngineError> {
        let mut obs = Observation::new(self.positions.clone())?;
        if let Some(signals) = &self.signals {
            signals.check("signals", 3)?;
            signals.expect_dim("signals", 1, self.positions.len())?;
            let (n, m, planes) = (signals.dim(0), signals.dim(1), signals.dim(2));
            let mut flat = Vec::with_capacity(n * m * planes);
            for state in 0..n {
                for col in 0..m {
                    for plane in 0..planes {
                        flat.push(signals.at(&[state, col, plane]).0);
                    }
                }
            }
            obs = obs.with_signals(n, planes, flat)?;
        }
        if let Some(symbols) = &self.symbols {
            obs = obs.with_symbols(symbols.as_bytes())?;
        }
        Ok(obs)
    }
}

impl LossDescription {
    pub fn to_augmentation(&self) -> Result<LossAugmentation, EngineError> {
        self.table.check("segment loss", 3)?;
        let size = self.table.dim(0);
        self.table.expect_dim("segment loss", 1, size)?;
        self.table.expect_dim("segment loss", 2, 2)?;
        let mut entries = Vec::with_capacity(size * size);
        for true_id in 0..size {
            for proposed in 0..size {
                entries.push((
                    self.table.at(&[true_id, proposed, 0]),
                    self.table.at(&[true_id, proposed, 1]),
                ));
            }
        }

        self.mask.check("segment id mask", 2)?;
        self.mask.expect_dim("segment id mask", 0, 2)?;
        let columns = self.mask.dim(1);
        let ids = (0..columns)
            .map(|c| {
                let id = self.mask.at(&[0, c]);
                usize::try_from(id)
                    .map_err(|_| EngineError::invalid(format!("segment id {id} at column {c} is negative")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let weights = (0..columns).map(|c| self.mask.at(&[1, c])).collect();

        Ok(LossAugmentation::new(
            SegmentLoss::new(size, entries)?,
            SegmentIdMask::new(ids, weights)?,
        ))
    }
}

impl DecodeRequest {
    /// Decode options, `nbest` falling back to `default_nbest`.
    pub fn options(&self, default_nbest: usize) -> Result<DecodeOptions, EngineError> {
        let defaults = DecodeOptions::default();
        Ok(DecodeOptions {
            nbest: self.nbest.unwrap_or(default_nbest),
            use_orf: self.use_orf,
            loss: self.loss.as_ref().map(LossDescription::to_augmentation).transpose()?,
            default_look_back: self.default_look_back.unwrap_or(defaults.default_look_back),
            ..defaults
        })
    }
}

impl From<&PathDescription> for PathHypothesis {
    fn from(path: &PathDescription) -> Self {
        PathHypothesis {
            score: 0.0,
            states: path.states.clone(),
            positions: path.positions.clone(),
        }
    }
}
