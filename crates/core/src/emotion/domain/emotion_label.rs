use std::fmt;

/// The closed set of labels a detection can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmotionLabel {
    Happy,
    Sad,
    Angry,
    Surprise,
    Neutral,
    Fear,
    Disgust,
    Unknown,
}

impl EmotionLabel {
    pub const ALL: &'static [EmotionLabel] = &[
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
        EmotionLabel::Fear,
        EmotionLabel::Disgust,
        EmotionLabel::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Unknown => "unknown",
        }
    }

    /// Case-insensitive lookup by canonical name. Names outside the set
    /// yield `None` rather than widening it.
    pub fn from_name(name: &str) -> Option<EmotionLabel> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
