use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A score as written in a model file.
///
/// JSON has no infinities, so `null` and the strings `"-inf"`, `"inf"` and
/// `"nan"` stand in for the non-finite values. Finite values are plain
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Score(pub f64);

impl Score {
    pub const NEG_INF: Score = Score(f64::NEG_INFINITY);
}

impl From<f64> for Score {
    fn from(v: f64) -> Self {
        Score(v)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScoreRepr {
    Number(f64),
    Text(String),
}

fn parse_text(text: &str) -> Option<f64> {
    match text.trim().to_ascii_lowercase().as_str() {
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<ScoreRepr>::deserialize(deserializer)? {
            None => Ok(Score::NEG_INF),
            Some(ScoreRepr::Number(v)) => Ok(Score(v)),
            Some(ScoreRepr::Text(text)) => parse_text(&text)
                .map(Score)
                .ok_or_else(|| D::Error::custom(format!("invalid score '{text}'"))),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("nan")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

pub(crate) fn values(scores: &[Score]) -> Vec<f64> {
    scores.iter().map(|s| s.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_non_finite_spellings() {
        let scores: Vec<Score> = serde_json::from_str(r#"[1.5, null, "-inf", "inf", "-2"]"#).unwrap();
        assert_eq!(scores[0].0, 1.5);
        assert_eq!(scores[1].0, f64::NEG_INFINITY);
        assert_eq!(scores[2].0, f64::NEG_INFINITY);
        assert_eq!(scores[3].0, f64::INFINITY);
        assert_eq!(scores[4].0, -2.0);
        assert!(serde_json::from_str::<Score>(r#""lots""#).is_err());
    }

    #[test]
    fn writes_non_finite_as_text() {
        let json = serde_json::to_string(&[Score(0.5), Score::NEG_INF]).unwrap();
        assert_eq!(json, r#"[0.5,"-inf"]"#);
    }
}
