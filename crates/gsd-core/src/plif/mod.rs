//! Piecewise-linear penalty functions (PLiFs).
//!
//! A `PenaltyFunction` maps a raw input (a segment length, or an external
//! per-segment score) through a [`ScoreTransform`] onto a breakpoint table and
//! interpolates linearly between breakpoints. Functions live in a
//! [`PlifArena`] and may chain forward to another function by id; a chained
//! lookup sums the terms of every link.

mod arena;
mod collection;

pub use arena::{PlifArena, PlifDerivatives};
pub use collection::PenaltyCollection;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::transform::ScoreTransform;

/// Bound on `|min_len|` and `|max_len|`.
pub const MAX_ABS_LEN: i32 = 100 * 1024 * 1024;

/// Index of a penalty function inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlifId(pub usize);

/// Result of a penalty lookup: the score and the input value the function
/// actually read (the raw input, or the external score in external mode).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub score: f64,
    pub input: f64,
}

#[derive(Debug, Clone)]
pub struct PenaltyFunction {
    pub(crate) id: PlifId,
    pub(crate) name: String,
    pub(crate) limits: Vec<f64>,
    pub(crate) values: Vec<f64>,
    pub(crate) transform: ScoreTransform,
    pub(crate) min_len: i32,
    pub(crate) max_len: i32,
    /// One-based index into the external score vector.
    pub(crate) external_score_index: Option<usize>,
    pub(crate) next: Option<PlifId>,
    pub(crate) use_cache: bool,
    /// `cache[i]` holds the own term for integer input `i` (no chain).
    pub(crate) cache: Option<Vec<f64>>,
}

impl PenaltyFunction {
    pub fn builder(id: usize, limits: Vec<f64>, values: Vec<f64>) -> PlifBuilder {
        PlifBuilder {
            id,
            name: String::new(),
            limits,
            values,
            transform: ScoreTransform::Linear,
            min_len: 0,
            max_len: 0,
            external_score_index: None,
            next: None,
            use_cache: false,
        }
    }

    pub fn id(&self) -> PlifId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limits(&self) -> &[f64] {
        &self.limits
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn transform(&self) -> ScoreTransform {
        self.transform
    }

    pub fn min_len(&self) -> i32 {
        self.min_len
    }

    pub fn max_len(&self) -> i32 {
        self.max_len
    }

    pub fn external_score_index(&self) -> Option<usize> {
        self.external_score_index
    }

    pub fn next(&self) -> Option<PlifId> {
        self.next
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn uses_external_scores(&self) -> bool {
        self.external_score_index.is_some()
    }

    /// Upper end of the input domain, used to bound decoder look-back.
    pub fn max_value(&self) -> f64 {
        self.max_len as f64
    }

    /// The input this function reads: the external score in external mode,
    /// the raw input otherwise. Missing external entries read as 0.
    fn representative_input(&self, raw: f64, external: &[f64]) -> f64 {
        match self.external_score_index {
            Some(idx) => external.get(idx - 1).copied().unwrap_or(0.0),
            None => raw,
        }
    }

    fn in_domain(&self, raw: f64) -> bool {
        raw >= self.min_len as f64 && raw <= self.max_len as f64
    }

    /// Number of breakpoints whose limit is `<= t`.
    fn breakpoint_index(&self, t: f64) -> usize {
        self.limits.partition_point(|&limit| limit <= t)
    }

    /// Interpolate the breakpoint table at transformed input `t`.
    fn interpolate(&self, t: f64) -> f64 {
        let len = self.limits.len();
        let idx = self.breakpoint_index(t);
        if idx == 0 {
            self.values[0]
        } else if idx == len {
            self.values[len - 1]
        } else {
            let (l0, l1) = (self.limits[idx - 1], self.limits[idx]);
            (self.values[idx] * (t - l0) + self.values[idx - 1] * (l1 - t)) / (l1 - l0)
        }
    }

    /// This function's own term, ignoring cache and chain.
    pub fn own_term(&self, raw: f64, external: &[f64]) -> Lookup {
        let input = self.representative_input(raw, external);
        if self.external_score_index.is_none() && !self.in_domain(raw) {
            return Lookup {
                score: f64::NEG_INFINITY,
                input,
            };
        }
        Lookup {
            score: self.interpolate(self.transform.apply(input)),
            input,
        }
    }

    /// Own term for an integer input, served from the cache when possible.
    pub fn own_term_int(&self, raw: i32, external: &[f64]) -> Lookup {
        if self.external_score_index.is_none() && self.in_domain(raw as f64) && raw >= 0 {
            if let Some(cache) = &self.cache {
                return Lookup {
                    score: cache[raw as usize],
                    input: raw as f64,
                };
            }
        }
        self.own_term(raw as f64, external)
    }

    /// Accumulate the derivative of this function's own term with respect to
    /// its breakpoint values.
    pub(crate) fn add_own_derivative(&self, raw: f64, external: &[f64], out: &mut [f64]) {
        if self.external_score_index.is_none() && !self.in_domain(raw) {
            return;
        }
        let t = self.transform.apply(self.representative_input(raw, external));
        let len = self.limits.len();
        let idx = self.breakpoint_index(t);
        if idx == 0 {
            out[0] += 1.0;
        } else if idx == len {
            out[len - 1] += 1.0;
        } else {
            let (l0, l1) = (self.limits[idx - 1], self.limits[idx]);
            out[idx] += (t - l0) / (l1 - l0);
            out[idx - 1] += (l1 - t) / (l1 - l0);
        }
    }

    fn build_cache(&mut self) {
        if !self.use_cache || self.external_score_index.is_some() || self.max_len < 0 {
            return;
        }
        let cache = (0..=self.max_len)
            .map(|i| {
                if i < self.min_len {
                    f64::NEG_INFINITY
                } else {
                    self.own_term(i as f64, &[]).score
                }
            })
            .collect();
        self.cache = Some(cache);
    }
}

/// Builder for [`PenaltyFunction`]. `build` checks the function in isolation;
/// cross-function checks (ids, chains) happen in [`PlifArena::new`].
#[derive(Debug, Clone)]
pub struct PlifBuilder {
    id: usize,
    name: String,
    limits: Vec<f64>,
    values: Vec<f64>,
    transform: ScoreTransform,
    min_len: i32,
    max_len: i32,
    external_score_index: Option<usize>,
    next: Option<usize>,
    use_cache: bool,
}

impl PlifBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn transform(mut self, transform: ScoreTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn len_range(mut self, min_len: i32, max_len: i32) -> Self {
        self.min_len = min_len;
        self.max_len = max_len;
        self
    }

    /// Read the one-based `index`-th external score instead of the raw input.
    pub fn external_score(mut self, index: usize) -> Self {
        self.external_score_index = Some(index);
        self
    }

    pub fn next(mut self, next: usize) -> Self {
        self.next = Some(next);
        self
    }

    pub fn cached(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn build(self) -> Result<PenaltyFunction> {
        let id = self.id;
        if self.limits.is_empty() {
            return Err(ModelError::InvalidFunction {
                id,
                reason: "no breakpoints".to_string(),
            });
        }
        if self.limits.len() != self.values.len() {
            return Err(ModelError::InvalidFunction {
                id,
                reason: format!(
                    "{} limits but {} values",
                    self.limits.len(),
                    self.values.len()
                ),
            });
        }
        for (index, (l, v)) in self.limits.iter().zip(&self.values).enumerate() {
            if !l.is_finite() || !v.is_finite() {
                return Err(ModelError::NonFiniteBreakpoint { id, index });
            }
        }
        if let Some(index) = self
            .limits
            .windows(2)
            .position(|w| w[1] <= w[0])
            .map(|i| i + 1)
        {
            return Err(ModelError::NonMonotonicBreakpoints { id, index });
        }
        for (field, value) in [("min_len", self.min_len), ("max_len", self.max_len)] {
            if value.unsigned_abs() > MAX_ABS_LEN as u32 {
                return Err(ModelError::LengthOutOfRange {
                    id,
                    field,
                    value: value as i64,
                });
            }
        }
        if self.min_len > self.max_len {
            return Err(ModelError::InvalidFunction {
                id,
                reason: format!("min_len {} > max_len {}", self.min_len, self.max_len),
            });
        }
        if self.external_score_index == Some(0) {
            return Err(ModelError::InvalidFunction {
                id,
                reason: "external score index is one-based".to_string(),
            });
        }
        if self.next == Some(id) {
            return Err(ModelError::CyclicChain(id));
        }

        Ok(PenaltyFunction {
            id: PlifId(id),
            name: self.name,
            limits: self.limits,
            values: self.values,
            transform: self.transform,
            min_len: self.min_len,
            max_len: self.max_len,
            external_score_index: self.external_score_index,
            next: self.next.map(PlifId),
            use_cache: self.use_cache,
            cache: None,
        })
    }
}
