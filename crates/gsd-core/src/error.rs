/// Errors raised while building a model or validating a decode request.
///
/// Everything is detected before any computation starts; a decode never
/// returns a partially computed result. Two families exist: configuration
/// errors (dangling ids, mismatched dimensions, cycles, bad request
/// parameters) and numerically degenerate breakpoint tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("{what} id {id} out of range (0..{len})")]
    IdOutOfRange { what: String, id: usize, len: usize },

    #[error("penalty function id {0} used more than once")]
    DuplicateId(usize),

    #[error("transition {src}->{dst} listed more than once")]
    DuplicateTransition { src: usize, dst: usize },

    #[error("penalty function chain starting at id {0} is cyclic")]
    CyclicChain(usize),

    #[error("penalty function {id}: {reason}")]
    InvalidFunction { id: usize, reason: String },

    #[error("penalty function {id}: {field} = {value} out of range")]
    LengthOutOfRange {
        id: usize,
        field: &'static str,
        value: i64,
    },

    #[error("penalty function {id}: breakpoint limits not strictly increasing at index {index}")]
    NonMonotonicBreakpoints { id: usize, index: usize },

    #[error("penalty function {id}: breakpoint {index} is not finite")]
    NonFiniteBreakpoint { id: usize, index: usize },

    #[error("unknown transform type '{0}'")]
    UnknownTransform(String),

    #[error("nbest must be in 1..={max}, got {nbest}")]
    InvalidNbest { nbest: usize, max: usize },

    #[error("iteration bound must be in 2..={max}, got {max_iter}")]
    InvalidIterations { max_iter: i64, max: usize },

    #[error("default look-back must be non-negative, got {0}")]
    InvalidLookBack(i32),

    #[error("observation sequence is empty")]
    EmptyObservation,

    #[error("positions span {span} coordinate units, above {max}")]
    PositionSpan { span: i64, max: i32 },

    #[error("positions must be non-decreasing (column {column})")]
    UnsortedPositions { column: usize },

    #[error("invalid symbol '{symbol}' at index {index}")]
    InvalidSymbol { index: usize, symbol: char },

    #[error("{0} requires the symbol sequence")]
    MissingSymbols(&'static str),

    #[error("reading-frame info for transition {src}->{dst} is inconsistent")]
    OrfMismatch { src: usize, dst: usize },

    #[error("state {state}: frame {frame} out of range")]
    InvalidFrame { state: usize, frame: i32 },

    #[error("content model: {0}")]
    InvalidContent(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl ModelError {
    /// Whether this is a configuration error as opposed to a degenerate
    /// breakpoint table.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ModelError::NonMonotonicBreakpoints { .. } | ModelError::NonFiniteBreakpoint { .. }
        )
    }

    pub(crate) fn dims(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        ModelError::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn out_of_range(what: impl Into<String>, id: usize, len: usize) -> Self {
        ModelError::IdOutOfRange {
            what: what.into(),
            id,
            len,
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
