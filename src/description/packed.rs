use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A dense array in column-major order, the first axis varying fastest.
///
/// Axes beyond `dims` have extent 1, so an `N x N` matrix also reads as
/// `N x N x 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedMatrix<T> {
    pub dims: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Copy> PackedMatrix<T> {
    pub fn new(dims: Vec<usize>, data: Vec<T>) -> Self {
        Self { dims, data }
    }

    pub fn dim(&self, axis: usize) -> usize {
        self.dims.get(axis).copied().unwrap_or(1)
    }

    /// Check that `data` fills `dims` exactly and that no axis past
    /// `max_axes` is longer than 1.
    pub(crate) fn check(&self, what: &str, max_axes: usize) -> Result<(), EngineError> {
        let expected: usize = self.dims.iter().product();
        if expected != self.data.len() {
            return Err(EngineError::invalid(format!(
                "{what}: dims {:?} need {expected} entries, got {}",
                self.dims,
                self.data.len()
            )));
        }
        if self.dims.iter().skip(max_axes).any(|&d| d != 1) {
            return Err(EngineError::invalid(format!(
                "{what}: at most {max_axes} axes, got dims {:?}",
                self.dims
            )));
        }
        Ok(())
    }

    pub(crate) fn expect_dim(&self, what: &str, axis: usize, expected: usize) -> Result<(), EngineError> {
        let actual = self.dim(axis);
        if actual != expected {
            return Err(gsd_core::ModelError::DimensionMismatch {
                what: format!("{what} axis {axis}"),
                expected,
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Entry at `index`; missing trailing indices are 0.
    pub fn at(&self, index: &[usize]) -> T {
        let mut flat = 0;
        let mut stride = 1;
        for (axis, &i) in index.iter().enumerate() {
            flat += i * stride;
            stride *= self.dim(axis);
        }
        self.data[flat]
    }
}
