pub mod decoder;
pub mod error;
pub mod gradient;
pub mod model;
pub mod observation;
pub mod plif;
pub mod settings;
pub mod transform;

pub use decoder::{
    decode, decode_free_length, decode_without_content, DecodeOptions, FreePath,
    LossAugmentation, PathHypothesis, SegmentIdMask, SegmentLoss,
};
pub use error::{ModelError, Result};
pub use gradient::{path_gradient, PathGradient};
pub use model::{Automaton, AutomatonBuilder, ContentModel, Transition, WordFrame};
pub use observation::Observation;
pub use plif::{PenaltyCollection, PenaltyFunction, PlifArena, PlifDerivatives, PlifId};
pub use transform::ScoreTransform;
