//! Domain types shared by the pipeline and the query layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Confidence below which a binary positive/negative verdict becomes neutral
pub const DEFAULT_NEUTRAL_THRESHOLD: f32 = 0.7;

/// Sentiment assigned to a single review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// All labels in display order
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Neutral, Self::Negative];

    /// Remap a binary classifier verdict into the three-class scheme.
    ///
    /// `label` is the raw model label (case-insensitive `positive` / `negative`,
    /// SST-2 style `LABEL_1` / `LABEL_0` are accepted as well). A verdict whose
    /// confidence is below `threshold` becomes [`SentimentLabel::Neutral`].
    pub fn from_binary(label: &str, confidence: f32, threshold: f32) -> Result<Self, Error> {
        let polar = match label.to_ascii_lowercase().as_str() {
            "positive" | "label_1" | "pos" => Self::Positive,
            "negative" | "label_0" | "neg" => Self::Negative,
            "neutral" => return Ok(Self::Neutral),
            other => {
                return Err(Error::classifier(format!(
                    "unexpected sentiment label '{other}'"
                )))
            }
        };

        if confidence < threshold {
            Ok(Self::Neutral)
        } else {
            Ok(polar)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(Error::invalid_input(format!("unknown sentiment label: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confident_verdicts_are_kept() {
        let label = SentimentLabel::from_binary("POSITIVE", 0.98, 0.7).unwrap();
        assert_eq!(label, SentimentLabel::Positive);

        let label = SentimentLabel::from_binary("NEGATIVE", 0.7, 0.7).unwrap();
        assert_eq!(label, SentimentLabel::Negative);
    }

    #[test]
    fn test_weak_verdicts_become_neutral() {
        let label = SentimentLabel::from_binary("POSITIVE", 0.69, 0.7).unwrap();
        assert_eq!(label, SentimentLabel::Neutral);

        let label = SentimentLabel::from_binary("negative", 0.51, 0.7).unwrap();
        assert_eq!(label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_sst2_style_labels() {
        assert_eq!(
            SentimentLabel::from_binary("LABEL_1", 0.9, 0.7).unwrap(),
            SentimentLabel::Positive
        );
        assert_eq!(
            SentimentLabel::from_binary("LABEL_0", 0.9, 0.7).unwrap(),
            SentimentLabel::Negative
        );
    }

    #[test]
    fn test_unknown_label_is_an_error() {
        assert!(SentimentLabel::from_binary("mixed", 0.9, 0.7).is_err());
    }

    #[test]
    fn test_round_trip_through_str() {
        for label in SentimentLabel::ALL {
            assert_eq!(label.as_str().parse::<SentimentLabel>().unwrap(), label);
        }
        assert!("Positive".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&SentimentLabel::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
    }

    proptest! {
        #[test]
        fn remap_follows_threshold(confidence in 0.0f32..=1.0, positive in any::<bool>()) {
            let raw = if positive { "positive" } else { "negative" };
            let label = SentimentLabel::from_binary(raw, confidence, DEFAULT_NEUTRAL_THRESHOLD).unwrap();
            if confidence < DEFAULT_NEUTRAL_THRESHOLD {
                prop_assert_eq!(label, SentimentLabel::Neutral);
            } else if positive {
                prop_assert_eq!(label, SentimentLabel::Positive);
            } else {
                prop_assert_eq!(label, SentimentLabel::Negative);
            }
        }
    }
}
