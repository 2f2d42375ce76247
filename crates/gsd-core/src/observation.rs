//! The observed sequence a decode aligns against.

use crate::error::{ModelError, Result};
use crate::model::KmerIndex;

/// Alignment columns with their coordinates, per-state signal planes and
/// the optional nucleotide sequence behind content scores and stop codons.
#[derive(Debug, Clone)]
pub struct Observation {
    positions: Vec<i32>,
    n_states: usize,
    n_planes: usize,
    /// `[(state * len + column) * n_planes + plane]`.
    signals: Vec<f64>,
    /// Symbol codes `A=0, C=1, G=2, T=3`.
    symbols: Option<Vec<u8>>,
}

impl Observation {
    /// `positions` must be non-empty and non-decreasing.
    pub fn new(positions: Vec<i32>) -> Result<Self> {
        if positions.is_empty() {
            return Err(ModelError::EmptyObservation);
        }
        if let Some(column) = positions.windows(2).position(|w| w[1] < w[0]) {
            return Err(ModelError::UnsortedPositions { column: column + 1 });
        }
        // every gap between two columns must fit an i32
        let span = i64::from(positions[positions.len() - 1]) - i64::from(positions[0]);
        if span > i64::from(i32::MAX) {
            return Err(ModelError::PositionSpan { span, max: i32::MAX });
        }
        Ok(Self {
            positions,
            n_states: 0,
            n_planes: 0,
            signals: Vec::new(),
            symbols: None,
        })
    }

    /// Attach signal values laid out `[state][column][plane]`.
    pub fn with_signals(mut self, n_states: usize, n_planes: usize, signals: Vec<f64>) -> Result<Self> {
        let expected = n_states * self.positions.len() * n_planes;
        if signals.len() != expected {
            return Err(ModelError::dims("signal values", expected, signals.len()));
        }
        self.n_states = n_states;
        self.n_planes = n_planes;
        self.signals = signals;
        Ok(self)
    }

    /// Attach the nucleotide sequence. `ACGT` in either case; anything else
    /// is rejected.
    pub fn with_symbols(mut self, symbols: &[u8]) -> Result<Self> {
        let codes = symbols
            .iter()
            .enumerate()
            .map(|(index, &b)| match b {
                b'A' | b'a' => Ok(0),
                b'C' | b'c' => Ok(1),
                b'G' | b'g' => Ok(2),
                b'T' | b't' => Ok(3),
                other => Err(ModelError::InvalidSymbol {
                    index,
                    symbol: other as char,
                }),
            })
            .collect::<Result<Vec<u8>>>()?;
        self.symbols = Some(codes);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    pub fn position(&self, column: usize) -> i32 {
        self.positions[column]
    }

    pub fn signal_states(&self) -> usize {
        self.n_states
    }

    pub fn signal_planes(&self) -> usize {
        self.n_planes
    }

    pub fn has_signals(&self) -> bool {
        self.n_planes > 0
    }

    pub fn signal(&self, state: usize, column: usize, plane: usize) -> f64 {
        self.signals[(state * self.positions.len() + column) * self.n_planes + plane]
    }

    pub fn symbol_codes(&self) -> Option<&[u8]> {
        self.symbols.as_deref()
    }

    pub(crate) fn require_symbols(&self, purpose: &'static str) -> Result<&[u8]> {
        self.symbol_codes().ok_or(ModelError::MissingSymbols(purpose))
    }

    pub fn kmer_index(&self, degrees: &[usize]) -> Result<KmerIndex> {
        Ok(KmerIndex::new(self.require_symbols("content scoring")?, degrees))
    }

    /// `stops[i]` is set when a stop codon (`TAA`, `TAG`, `TGA`) starts at `i`.
    pub fn stop_codons(&self) -> Result<Vec<bool>> {
        let codes = self.require_symbols("reading-frame checking")?;
        let mut stops = vec![false; codes.len()];
        for (i, w) in codes.windows(3).enumerate() {
            stops[i] = matches!(w, [3, 0, 0] | [3, 0, 2] | [3, 2, 0]);
        }
        Ok(stops)
    }
}
