use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Longest supported k-mer.
pub const MAX_WORD_DEGREE: usize = 12;

/// Reading-frame filter of one content score: a k-mer starting at `i`
/// counts for a segment ending at position `end` only when
/// `end - offset - i` is positive and divisible by `modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFrame {
    pub modulus: i32,
    pub offset: i32,
}

impl Default for WordFrame {
    fn default() -> Self {
        Self {
            modulus: 1,
            offset: 0,
        }
    }
}

/// Translates the symbol sequence into per-segment content scores.
///
/// Each score is a weighted k-mer count over the segment, summed over all
/// word degrees. Weights are laid out per score as one table of
/// `Σ 4^degree` entries, degrees in order.
#[derive(Debug, Clone)]
pub struct ContentModel {
    degrees: Vec<usize>,
    /// `word_offsets[j]` = first weight index of degree `j`; one extra
    /// trailing entry holds the table width.
    word_offsets: Vec<usize>,
    /// `[score][word]`.
    weights: Vec<Vec<f64>>,
    frames: Vec<WordFrame>,
    sign_words: Vec<bool>,
}

impl ContentModel {
    pub fn new(
        degrees: Vec<usize>,
        weights: Vec<Vec<f64>>,
        frames: Vec<WordFrame>,
        sign_words: Vec<bool>,
    ) -> Result<Self> {
        let mut word_offsets = Vec::with_capacity(degrees.len() + 1);
        let mut width = 0usize;
        for &d in &degrees {
            if d == 0 || d > MAX_WORD_DEGREE {
                return Err(ModelError::InvalidContent(format!(
                    "word degree {d} outside 1..={MAX_WORD_DEGREE}"
                )));
            }
            word_offsets.push(width);
            width += 1 << (2 * d);
        }
        word_offsets.push(width);

        let num_scores = weights.len();
        for row in &weights {
            if row.len() != width {
                return Err(ModelError::dims("dictionary weights per score", width, row.len()));
            }
        }
        if frames.len() != num_scores {
            return Err(ModelError::dims("word frames", num_scores, frames.len()));
        }
        if sign_words.len() != num_scores {
            return Err(ModelError::dims("sign-word flags", num_scores, sign_words.len()));
        }
        if let Some(f) = frames.iter().find(|f| f.modulus < 1) {
            return Err(ModelError::InvalidContent(format!(
                "word frame modulus must be positive, got {}",
                f.modulus
            )));
        }

        Ok(Self {
            degrees,
            word_offsets,
            weights,
            frames,
            sign_words,
        })
    }

    pub fn degrees(&self) -> &[usize] {
        &self.degrees
    }

    pub fn num_scores(&self) -> usize {
        self.weights.len()
    }

    /// Width of one score's weight table (`Σ 4^degree`).
    pub fn num_words(&self) -> usize {
        self.word_offsets[self.degrees.len()]
    }

    pub fn weights(&self, score: usize) -> &[f64] {
        &self.weights[score]
    }

    pub fn frame(&self, score: usize) -> WordFrame {
        self.frames[score]
    }

    pub fn sign_words(&self, score: usize) -> bool {
        self.sign_words[score]
    }

    /// Content scores of the single segment `[start, end)` of `index`.
    pub fn segment_scores(&self, index: &KmerIndex, start: i32, end: i32) -> Vec<f64> {
        let mut scores = ContentScores::new(self);
        scores.fill(self, index, &[start, end], 1, end - start);
        scores.get(1).to_vec()
    }
}

/// k-mer codes of the symbol sequence, one table per word degree.
///
/// `words[j][i]` is the big-endian base-4 code of `symbols[i..i + d]`, or
/// `None` when the k-mer runs past the end of the sequence.
#[derive(Debug, Clone)]
pub struct KmerIndex {
    words: Vec<Vec<Option<u32>>>,
}

impl KmerIndex {
    /// `codes` holds one value in `0..4` per symbol.
    pub fn new(codes: &[u8], degrees: &[usize]) -> Self {
        let words = degrees
            .iter()
            .map(|&d| {
                (0..codes.len())
                    .map(|i| {
                        let window = codes.get(i..i + d)?;
                        Some(window.iter().fold(0u32, |acc, &c| (acc << 2) | c as u32))
                    })
                    .collect()
            })
            .collect();
        Self { words }
    }

    pub(crate) fn word(&self, degree: usize, i: i32) -> Option<u32> {
        if i < 0 {
            return None;
        }
        self.words[degree].get(i as usize).copied().flatten()
    }
}

/// Content scores of every segment ending at one column, indexed by the
/// number of columns the segment spans.
///
/// Buffers are reused across end columns within one decode.
#[derive(Debug, Clone)]
pub(crate) struct ContentScores {
    num_scores: usize,
    /// `[plen * num_scores + score]`, row 0 unused.
    values: Vec<f64>,
    max_plen: usize,
    zeros: Vec<f64>,
    unnormalised: Vec<f64>,
    counts: Vec<u32>,
    /// `[score][word]` seen-flags for sign-word scores, reset through `touched`.
    used: Vec<Vec<bool>>,
    touched: Vec<(usize, usize)>,
}

impl ContentScores {
    pub fn new(model: &ContentModel) -> Self {
        let n = model.num_scores();
        let widest = model
            .degrees
            .iter()
            .map(|&d| 1usize << (2 * d))
            .max()
            .unwrap_or(0);
        Self {
            num_scores: n,
            values: Vec::new(),
            max_plen: 0,
            zeros: vec![0.0; n],
            unnormalised: vec![0.0; n],
            counts: vec![0; n],
            used: (0..n)
                .map(|s| {
                    if model.sign_words[s] {
                        vec![false; widest]
                    } else {
                        Vec::new()
                    }
                })
                .collect(),
            touched: Vec::new(),
        }
    }

    /// Scores of the segment spanning `plen` columns back from the end
    /// column of the last `fill`. Zero outside the filled window.
    pub fn get(&self, plen: usize) -> &[f64] {
        if plen == 0 || plen > self.max_plen {
            return &self.zeros;
        }
        let n = self.num_scores;
        &self.values[plen * n..(plen + 1) * n]
    }

    /// Compute scores for every segment `[positions[ts], positions[t_end])`
    /// with `positions[t_end] - positions[ts] <= look_back`.
    ///
    /// Walking `ts` downwards, each step adds the k-mers starting in
    /// `[positions[ts], positions[ts + 1])` that end inside the segment, so
    /// the counts are cumulative.
    pub fn fill(
        &mut self,
        model: &ContentModel,
        index: &KmerIndex,
        positions: &[i32],
        t_end: usize,
        look_back: i32,
    ) {
        let n = self.num_scores;
        let end = positions[t_end];
        self.max_plen = t_end;
        self.values.clear();
        self.values.resize((t_end + 1) * n, 0.0);
        if n == 0 || t_end == 0 {
            return;
        }

        for (j, &degree) in model.degrees.iter().enumerate() {
            let offset = model.word_offsets[j];
            self.unnormalised.fill(0.0);
            self.counts.fill(0);
            for (s, w) in self.touched.drain(..) {
                self.used[s][w] = false;
            }

            // k-mer starts still to visit lie below `prev`.
            let mut prev = end - degree as i32 + 1;
            let mut ts = t_end - 1;
            let mut plen = 1;
            loop {
                let current = positions[ts].max(0);
                if end - current > look_back {
                    break;
                }
                let mut i = prev - 1;
                while i >= current {
                    if let Some(word) = index.word(j, i) {
                        let w = word as usize;
                        for s in 0..n {
                            let sign = model.sign_words[s];
                            if sign && self.used[s][w] {
                                continue;
                            }
                            let frame = model.frames[s];
                            let rel = end - frame.offset - i;
                            if rel > 0 && rel % frame.modulus == 0 {
                                self.unnormalised[s] += model.weights[s][offset + w];
                                self.counts[s] += 1;
                                if sign {
                                    self.used[s][w] = true;
                                    self.touched.push((s, w));
                                }
                            }
                        }
                    }
                    i -= 1;
                }
                for s in 0..n {
                    let norm = match (self.counts[s], model.sign_words[s]) {
                        (0, _) => 1.0,
                        (c, true) => (c as f64).sqrt(),
                        (c, false) => c as f64,
                    };
                    self.values[plen * n + s] += self.unnormalised[s] / norm;
                }
                prev = prev.min(current);

                if ts == 0 {
                    break;
                }
                ts -= 1;
                plen += 1;
            }
        }
    }
}
