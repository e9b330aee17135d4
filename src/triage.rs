// 🚨 Maintenance Triage - stemmed keyword matching
//
// "LEAKING pipe", "a leak in the pipe" and "Leaks!" all reduce to the stem
// "leak" and land in the same bucket. Multi-word keywords ("gas leak",
// "no water") must appear as adjacent tokens.

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Urgency indicators: safety hazards, utility outages, structural damage,
/// pests and mold, security, temperature and odor problems.
pub const URGENT_KEYWORDS: &[&str] = &[
    "urgent", "leak", "broken", "flood", "power outage", "emergency", "fire", "gas leak",
    "no water", "no electricity", "electrcity", "burst pipe", "damaged", "crack", "repair needed",
    "water damage", "lockout", "blocked drain", "mold", "heating issue", "air conditioning",
    "roof damage", "pest", "infestation", "malfunction", "hazard", "security", "alarm",
    "structural damage", "water heater", "smoke", "odor", "sewage", "toilet issue",
    "electrical fault", "sparking", "foul smell", "noise complaint", "temperature control",
];

// ============================================================================
// PRIORITY LABEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityLabel {
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Normal Priority")]
    Normal,
}

impl PriorityLabel {
    /// Stored form in the `maintenance.priority` column
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLabel::High => "High Priority",
            PriorityLabel::Normal => "Normal Priority",
        }
    }

    /// Short colored marker for listings
    pub fn marker(&self) -> &'static str {
        match self {
            PriorityLabel::High => "🔴 High",
            PriorityLabel::Normal => "🟢 Normal",
        }
    }
}

impl fmt::Display for PriorityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High Priority" => Ok(PriorityLabel::High),
            "Normal Priority" => Ok(PriorityLabel::Normal),
            other => Err(other.to_string()),
        }
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

struct Keyword {
    phrase: String,
    stems: Vec<String>,
}

pub struct TriageClassifier {
    stemmer: Stemmer,
    keywords: Vec<Keyword>,
}

impl TriageClassifier {
    /// Classifier over the built-in urgency keywords
    pub fn new() -> Self {
        Self::with_keywords(URGENT_KEYWORDS.iter().copied())
    }

    /// Classifier over a custom keyword list. Keywords are stemmed once here.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stemmer = Stemmer::create(Algorithm::English);

        let keywords = keywords
            .into_iter()
            .filter_map(|phrase| {
                let phrase = phrase.as_ref().to_string();
                let stems = stem_tokens(&stemmer, &phrase);
                if stems.is_empty() {
                    None
                } else {
                    Some(Keyword { phrase, stems })
                }
            })
            .collect();

        TriageClassifier { stemmer, keywords }
    }

    pub fn classify(&self, description: &str) -> PriorityLabel {
        match self.matched_keyword(description) {
            Some(keyword) => {
                debug!(keyword, "urgent keyword matched");
                PriorityLabel::High
            }
            None => PriorityLabel::Normal,
        }
    }

    /// First keyword (in list order) whose stems occur in `description`
    pub fn matched_keyword(&self, description: &str) -> Option<&str> {
        let tokens = stem_tokens(&self.stemmer, description);
        let token_set: HashSet<&str> = tokens.iter().map(String::as_str).collect();

        self.keywords
            .iter()
            .find(|keyword| match keyword.stems.as_slice() {
                [single] => token_set.contains(single.as_str()),
                phrase => tokens.windows(phrase.len()).any(|window| window == phrase),
            })
            .map(|keyword| keyword.phrase.as_str())
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

impl Default for TriageClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, split on anything that is not a letter or digit, stem each word.
fn stem_tokens(stemmer: &Stemmer, text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| stemmer.stem(token).into_owned())
        .collect()
}
