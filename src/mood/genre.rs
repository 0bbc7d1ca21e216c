use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::GenreId;

/// Genre used for labels without a mapping (Comedy).
pub const DEFAULT_GENRE: GenreId = GenreId(35);

/// Label as returned by the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoodLabel(String);

impl MoodLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mood(&self) -> Option<Mood> {
        Mood::parse(&self.0)
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Angry,
        Mood::Disgust,
        Mood::Fear,
        Mood::Happy,
        Mood::Sad,
        Mood::Surprise,
        Mood::Neutral,
    ];

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Angry => "angry",
            Mood::Disgust => "disgust",
            Mood::Fear => "fear",
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Surprise => "surprise",
            Mood::Neutral => "neutral",
        }
    }

    pub fn genre(&self) -> GenreId {
        match self {
            Mood::Angry => GenreId(28),     // Action
            Mood::Disgust => GenreId(99),   // Documentary
            Mood::Fear => GenreId(27),      // Horror
            Mood::Happy => GenreId(35),     // Comedy
            Mood::Sad => GenreId(18),       // Drama
            Mood::Surprise => GenreId(9648), // Mystery
            Mood::Neutral => GenreId(10749), // Romance
        }
    }
}

/// Map a mood label to the genre used for suggestions.
/// Matching ignores case and surrounding whitespace; unknown labels get
/// [`DEFAULT_GENRE`].
pub fn resolve_genre(label: &str) -> GenreId {
    Mood::parse(label)
        .map(|m| m.genre())
        .unwrap_or(DEFAULT_GENRE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(resolve_genre("HAPPY"), resolve_genre("happy"));
        assert_eq!(resolve_genre(" Sad "), GenreId(18));
        assert_eq!(resolve_genre("SuRpRiSe"), GenreId(9648));
    }

    #[test]
    fn test_resolve_table() {
        let expected = [
            ("angry", 28),
            ("disgust", 99),
            ("fear", 27),
            ("happy", 35),
            ("sad", 18),
            ("surprise", 9648),
            ("neutral", 10749),
        ];
        for (label, genre) in expected {
            assert_eq!(resolve_genre(label), GenreId(genre), "label {}", label);
        }
    }

    #[test]
    fn test_unknown_label_uses_default() {
        assert_eq!(resolve_genre("unknown-mood"), DEFAULT_GENRE);
        assert_eq!(resolve_genre(""), DEFAULT_GENRE);
    }

    #[test]
    fn test_label_mood() {
        assert_eq!(MoodLabel::new("Fear").mood(), Some(Mood::Fear));
        assert_eq!(MoodLabel::new("bored").mood(), None);
    }
}
