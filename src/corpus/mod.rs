//! Question corpus
//!
//! Question templates per (category type, category name), split into three
//! willingness tiers. Categories start out served from built-in defaults and
//! switch to generated datasets once background generation has produced one.

mod defaults;
mod generator;
mod manager;
mod store;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::willingness::WillingnessTier;

pub use defaults::{FALLBACK_QUESTION, default_questions};
pub use generator::{LlmQuestionGenerator, MAX_BATCH};
pub use manager::{CorpusManager, Readiness};
pub use store::{CorpusStore, CsvCorpusStore, MemoryCorpusStore};

/// Maximum candidates fetched per (category, tier) lookup
pub const CANDIDATES_PER_TIER: usize = 25;

/// Axis a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    /// Professional main trait (industry)
    Main,
    /// Professional subcategory (the profession itself)
    Subcategory,
    /// Personal interest
    Hobby,
    /// Closing feedback
    Feedback,
    /// Generic fallback when no category is known
    General,
}

impl CategoryType {
    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Subcategory => "subcategory",
            Self::Hobby => "hobby",
            Self::Feedback => "feedback",
            Self::General => "general",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "subcategory" | "profession" => Ok(Self::Subcategory),
            "hobby" => Ok(Self::Hobby),
            "feedback" => Ok(Self::Feedback),
            "general" => Ok(Self::General),
            other => Err(Error::Config(format!("unknown category type: {other}"))),
        }
    }
}

/// One question, immutable once created
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub text: String,
    pub category_type: CategoryType,
    pub category_name: String,
    pub tier: WillingnessTier,
}

/// Identifies one dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub category_type: CategoryType,
    pub name: String,
}

impl CategoryKey {
    #[must_use]
    pub fn new(category_type: CategoryType, name: &str) -> Self {
        Self {
            category_type,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category_type, self.name)
    }
}

/// Assign tiers by position: first third low, next third medium, rest high
#[must_use]
pub fn partition_by_tier(
    texts: Vec<String>,
    category_type: CategoryType,
    category_name: &str,
) -> Vec<QuestionTemplate> {
    let thirds = texts.len() / 3;

    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let tier = if i < thirds {
                WillingnessTier::Low
            } else if i < 2 * thirds {
                WillingnessTier::Medium
            } else {
                WillingnessTier::High
            };
            QuestionTemplate {
                text,
                category_type,
                category_name: category_name.to_string(),
                tier,
            }
        })
        .collect()
}

/// Question texts already presented in one session
///
/// Grows monotonically and is dropped with the session.
#[derive(Debug, Clone, Default)]
pub struct AskedSet {
    texts: HashSet<String>,
}

impl AskedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a text; returns false if it was already present
    pub fn insert(&mut self, text: &str) -> bool {
        self.texts.insert(text.to_string())
    }

    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.texts.contains(text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Default questions served over the life of the process
///
/// Owned by whoever builds the [`CorpusManager`], so repeated sessions can
/// share it and tests can reset it between runs.
#[derive(Debug, Clone, Default)]
pub struct UsedDefaults {
    served: HashMap<String, u32>,
}

impl UsedDefaults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, text: &str) {
        *self.served.entry(text.to_string()).or_default() += 1;
    }

    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.served.contains_key(text)
    }

    /// How many times a default has been served
    #[must_use]
    pub fn count(&self, text: &str) -> u32 {
        self.served.get(text).copied().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.served.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.served.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.served.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_splits_into_thirds() {
        let texts: Vec<String> = (0..9).map(|i| format!("q{i}?")).collect();
        let tiered = partition_by_tier(texts, CategoryType::Main, "engineering");

        let tiers: Vec<_> = tiered.iter().map(|q| q.tier).collect();
        assert_eq!(&tiers[..3], &[WillingnessTier::Low; 3]);
        assert_eq!(&tiers[3..6], &[WillingnessTier::Medium; 3]);
        assert_eq!(&tiers[6..], &[WillingnessTier::High; 3]);
    }

    #[test]
    fn partition_puts_remainder_in_high() {
        let texts: Vec<String> = (0..25).map(|i| format!("q{i}?")).collect();
        let tiered = partition_by_tier(texts, CategoryType::Hobby, "chess");

        let high = tiered.iter().filter(|q| q.tier == WillingnessTier::High).count();
        assert_eq!(high, 9);
        assert!(tiered.iter().all(|q| q.category_name == "chess"));
    }

    #[test]
    fn tiny_batches_are_all_high() {
        let tiered = partition_by_tier(vec!["only?".to_string()], CategoryType::Main, "x");
        assert_eq!(tiered[0].tier, WillingnessTier::High);
    }

    #[test]
    fn asked_set_rejects_duplicates() {
        let mut asked = AskedSet::new();
        assert!(asked.insert("What drew you in?"));
        assert!(!asked.insert("What drew you in?"));
        assert_eq!(asked.len(), 1);
    }

    #[test]
    fn category_type_parses_aliases() {
        assert_eq!("profession".parse::<CategoryType>().unwrap(), CategoryType::Subcategory);
        assert_eq!(" Hobby ".parse::<CategoryType>().unwrap(), CategoryType::Hobby);
        assert!("hobbies".parse::<CategoryType>().is_err());
    }

    #[test]
    fn used_defaults_counts_and_resets() {
        let mut used = UsedDefaults::new();
        used.record("a");
        used.record("a");
        assert_eq!(used.count("a"), 2);
        used.clear();
        assert!(used.is_empty());
    }
}
