use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Loss table `[true_id][proposed_id] -> (per_segment, per_length)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentLoss {
    size: usize,
    entries: Vec<(f64, f64)>,
}

impl SegmentLoss {
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            entries: vec![(0.0, 0.0); size * size],
        }
    }

    /// `entries` is laid out row-major by true id.
    pub fn new(size: usize, entries: Vec<(f64, f64)>) -> Result<Self> {
        if entries.len() != size * size {
            return Err(ModelError::dims("segment loss entries", size * size, entries.len()));
        }
        Ok(Self { size, entries })
    }

    pub fn set(&mut self, true_id: usize, proposed_id: usize, per_segment: f64, per_length: f64) {
        self.entries[true_id * self.size + proposed_id] = (per_segment, per_length);
    }

    pub fn get(&self, true_id: usize, proposed_id: usize) -> (f64, f64) {
        self.entries[true_id * self.size + proposed_id]
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// Per-column segment ids of the reference labelling (row 0) and their
/// weights (row 1). A weight of 0 marks a column that may absorb one id
/// switch without it counting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentIdMask {
    ids: Vec<usize>,
    weights: Vec<i32>,
}

impl SegmentIdMask {
    pub fn new(ids: Vec<usize>, weights: Vec<i32>) -> Result<Self> {
        if ids.len() != weights.len() {
            return Err(ModelError::dims("segment id mask weights", ids.len(), weights.len()));
        }
        Ok(Self { ids, weights })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn weights(&self) -> &[i32] {
        &self.weights
    }
}

/// Loss table plus reference mask, enabling loss-augmented decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossAugmentation {
    pub loss: SegmentLoss,
    pub mask: SegmentIdMask,
}

impl LossAugmentation {
    pub fn new(loss: SegmentLoss, mask: SegmentIdMask) -> Self {
        Self { loss, mask }
    }

    /// Check against an automaton's largest segment id and an observation
    /// length. The table must cover exactly the ids `0..=max_segment_id`.
    pub fn validate(&self, max_segment_id: usize, columns: usize) -> Result<()> {
        if self.loss.size() != max_segment_id + 1 {
            return Err(ModelError::dims(
                "segment loss table size",
                max_segment_id + 1,
                self.loss.size(),
            ));
        }
        if self.mask.len() != columns {
            return Err(ModelError::dims("segment id mask", columns, self.mask.len()));
        }
        if let Some(&id) = self.mask.ids().iter().find(|&&id| id >= self.loss.size()) {
            return Err(ModelError::out_of_range("mask segment id", id, self.loss.size()));
        }
        Ok(())
    }
}

/// Segment counts and covered lengths per id for every start column of a
/// look-back window ending at one column.
#[derive(Debug, Clone)]
pub(crate) struct LossWindow {
    n_ids: usize,
    /// `[ts * n_ids + id]`.
    counts: Vec<i64>,
    lengths: Vec<i64>,
    /// Lowest start column filled by the last `fill`.
    lowest: usize,
}

impl LossWindow {
    pub fn new(n_ids: usize) -> Self {
        Self {
            n_ids,
            counts: Vec::new(),
            lengths: Vec::new(),
            lowest: usize::MAX,
        }
    }

    /// Accumulate the reference segmentation of `[positions[ts], positions[t_end])`
    /// for every `ts` with `positions[t_end] - positions[ts] <= look_back`.
    pub fn fill(&mut self, mask: &SegmentIdMask, positions: &[i32], t_end: usize, look_back: i32) {
        let w = self.n_ids;
        let rows = (t_end + 1) * w;
        self.counts.resize(rows, 0);
        self.lengths.resize(rows, 0);
        self.counts[t_end * w..rows].fill(0);
        self.lengths[t_end * w..rows].fill(0);
        self.lowest = t_end;

        let mut wobble_switches = 0;
        let mut last_id = None;
        let mut ts = t_end;
        while ts > 0 && positions[t_end] - positions[ts - 1] <= look_back {
            ts -= 1;
            let id = mask.ids[ts];
            let weight = mask.weights[ts] as i64;
            let wobble = weight == 0 && wobble_switches == 0;
            self.counts.copy_within((ts + 1) * w..(ts + 2) * w, ts * w);
            self.lengths.copy_within((ts + 1) * w..(ts + 2) * w, ts * w);

            let step = (positions[ts + 1] - positions[ts]) as i64;
            if last_id != Some(id) {
                if wobble {
                    wobble_switches += 1;
                } else {
                    self.counts[ts * w + id] += weight;
                    self.lengths[ts * w + id] += step * weight;
                    wobble_switches = 0;
                }
                last_id = Some(id);
            } else if !wobble {
                self.lengths[ts * w + id] += step;
            }
            self.lowest = ts;
        }
    }

    /// Loss of proposing a segment `[ts, t_end)` with `segment_id`.
    pub fn loss(&self, ts: usize, segment_id: usize, table: &SegmentLoss) -> f64 {
        if ts < self.lowest || (ts + 1) * self.n_ids > self.counts.len() {
            return 0.0;
        }
        let row = ts * self.n_ids;
        (0..self.n_ids)
            .map(|i| {
                let (per_segment, per_length) = table.get(i, segment_id);
                let mut l = 0.0;
                if self.counts[row + i] != 0 {
                    l += self.counts[row + i] as f64 * per_segment;
                }
                if self.lengths[row + i] != 0 {
                    l += self.lengths[row + i] as f64 * per_length;
                }
                l
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SegmentLoss {
        // id 0 vs 1: mismatches cost 1 per segment and 0.5 per length unit
        let mut t = SegmentLoss::zeros(2);
        t.set(0, 1, 1.0, 0.5);
        t.set(1, 0, 1.0, 0.5);
        t
    }

    #[test]
    fn matching_segment_has_zero_loss() {
        let mask = SegmentIdMask::new(vec![0, 0, 0, 0], vec![1, 1, 1, 1]).unwrap();
        let positions = [0, 10, 20, 30];
        let mut w = LossWindow::new(2);
        w.fill(&mask, &positions, 3, 100);
        assert_eq!(w.loss(0, 0, &table()), 0.0);
        // proposing id 1 over a reference of id 0: one segment, 30 units
        assert_eq!(w.loss(0, 1, &table()), 1.0 + 15.0);
        assert_eq!(w.loss(2, 1, &table()), 1.0 + 5.0);
    }

    #[test]
    fn two_reference_segments() {
        let mask = SegmentIdMask::new(vec![0, 0, 1, 1], vec![1, 1, 1, 1]).unwrap();
        let positions = [0, 10, 20, 30];
        let mut w = LossWindow::new(2);
        w.fill(&mask, &positions, 3, 100);
        // [0, 30) proposed as id 0: reference id 1 covers [20, 30)
        assert_eq!(w.loss(0, 0, &table()), 1.0 + 5.0);
        // proposed as id 1: reference id 0 covers [0, 20)
        assert_eq!(w.loss(0, 1, &table()), 1.0 + 10.0);
    }

    #[test]
    fn wobble_column_absorbs_one_switch() {
        let mask = SegmentIdMask::new(vec![0, 1, 0, 0], vec![1, 0, 1, 1]).unwrap();
        let positions = [0, 10, 20, 30];
        let mut w = LossWindow::new(2);
        w.fill(&mask, &positions, 3, 100);
        // column 1 switches to id 1 with weight 0: no id-1 segment is recorded
        assert_eq!(w.counts[..2], [2, 0]);
        assert_eq!(w.lengths[..2], [20, 0]);
        assert_eq!(w.loss(0, 0, &table()), 0.0);
        assert_eq!(w.loss(0, 1, &table()), 2.0 + 10.0);
    }

    #[test]
    fn window_limits_rows() {
        let mask = SegmentIdMask::new(vec![1, 1, 1, 1], vec![1, 1, 1, 1]).unwrap();
        let positions = [0, 10, 20, 30];
        let mut w = LossWindow::new(2);
        w.fill(&mask, &positions, 3, 15);
        assert_eq!(w.loss(2, 0, &table()), 1.0 + 5.0);
        assert_eq!(w.loss(1, 0, &table()), 0.0);
    }

    #[test]
    fn validate_dimensions() {
        let aug = LossAugmentation::new(
            SegmentLoss::zeros(2),
            SegmentIdMask::new(vec![0, 1, 0], vec![1, 1, 1]).unwrap(),
        );
        assert!(aug.validate(1, 3).is_ok());
        assert!(aug.validate(2, 3).is_err());
        assert!(aug.validate(1, 4).is_err());
        // wider than the automaton's ids
        assert!(aug.validate(0, 3).is_err());
        assert!(SegmentIdMask::new(vec![0], vec![]).is_err());
        assert!(SegmentLoss::new(2, vec![(0.0, 0.0); 3]).is_err());
    }
}
