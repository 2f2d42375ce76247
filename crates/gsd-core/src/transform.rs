use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::ModelError;

/// Transform applied to a raw input before breakpoint interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScoreTransform {
    #[default]
    Linear,
    Log,
    LogPlus1,
    LogPlus3,
    LinearPlus3,
}

impl ScoreTransform {
    /// Parse a transform name, rejecting unknown names.
    ///
    /// Accepted: `linear` (or empty), `log`, `log(+1)`, `log(+3)`, `(+3)`.
    pub fn parse_name(name: &str) -> Result<Self, ModelError> {
        match name {
            "linear" | "" => Ok(Self::Linear),
            "log" => Ok(Self::Log),
            "log(+1)" => Ok(Self::LogPlus1),
            "log(+3)" => Ok(Self::LogPlus3),
            "(+3)" => Ok(Self::LinearPlus3),
            other => Err(ModelError::UnknownTransform(other.to_string())),
        }
    }

    /// Lenient variant of [`parse_name`](Self::parse_name): an unknown name
    /// is logged and treated as the identity.
    pub fn from_name(name: &str) -> Self {
        Self::parse_name(name).unwrap_or_else(|_| {
            warn!(name, "unknown transform type, using linear");
            Self::Linear
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Log => "log",
            Self::LogPlus1 => "log(+1)",
            Self::LogPlus3 => "log(+3)",
            Self::LinearPlus3 => "(+3)",
        }
    }

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Log => x.ln(),
            Self::LogPlus1 => (x + 1.0).ln(),
            Self::LogPlus3 => (x + 3.0).ln(),
            Self::LinearPlus3 => x + 3.0,
        }
    }
}

impl fmt::Display for ScoreTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ScoreTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ScoreTransform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_names() {
        assert_eq!(ScoreTransform::parse_name("linear"), Ok(ScoreTransform::Linear));
        assert_eq!(ScoreTransform::parse_name(""), Ok(ScoreTransform::Linear));
        assert_eq!(ScoreTransform::parse_name("log"), Ok(ScoreTransform::Log));
        assert_eq!(ScoreTransform::parse_name("log(+1)"), Ok(ScoreTransform::LogPlus1));
        assert_eq!(ScoreTransform::parse_name("log(+3)"), Ok(ScoreTransform::LogPlus3));
        assert_eq!(ScoreTransform::parse_name("(+3)"), Ok(ScoreTransform::LinearPlus3));
    }

    #[test]
    fn unknown_name_is_identity() {
        assert!(ScoreTransform::parse_name("sqrt").is_err());
        let t = ScoreTransform::from_name("sqrt");
        assert_eq!(t, ScoreTransform::Linear);
        assert_eq!(t.apply(7.5), 7.5);
    }

    #[test]
    fn apply_values() {
        assert_eq!(ScoreTransform::Linear.apply(2.0), 2.0);
        assert_eq!(ScoreTransform::Log.apply(1.0), 0.0);
        assert_eq!(ScoreTransform::LogPlus1.apply(0.0), 0.0);
        assert_eq!(ScoreTransform::LogPlus3.apply(-2.0), 0.0);
        assert_eq!(ScoreTransform::LinearPlus3.apply(2.0), 5.0);
        assert_eq!(ScoreTransform::Log.apply(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn names_round_trip() {
        for t in [
            ScoreTransform::Linear,
            ScoreTransform::Log,
            ScoreTransform::LogPlus1,
            ScoreTransform::LogPlus3,
            ScoreTransform::LinearPlus3,
        ] {
            assert_eq!(ScoreTransform::parse_name(t.name()), Ok(t));
        }
    }
}
