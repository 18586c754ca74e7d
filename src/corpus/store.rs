//! Persistence for generated question datasets

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{CategoryKey, CategoryType, QuestionTemplate};
use crate::willingness::WillingnessTier;
use crate::{Error, Result};

/// Storage for generated datasets
///
/// Calls are short and synchronous; the corpus manager makes them while
/// holding its state lock.
pub trait CorpusStore: Send + Sync {
    /// Whether a dataset exists for this category
    fn exists(&self, category_type: CategoryType, name: &str) -> bool;

    /// Load a dataset
    ///
    /// # Errors
    ///
    /// Returns error if the dataset is missing or unreadable
    fn load(&self, category_type: CategoryType, name: &str) -> Result<Vec<QuestionTemplate>>;

    /// Persist a dataset, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns error if the dataset cannot be written
    fn save(&self, category_type: CategoryType, name: &str, questions: &[QuestionTemplate])
    -> Result<()>;
}

/// One row of a dataset file
#[derive(Debug, Serialize, Deserialize)]
struct QuestionRow {
    question: String,
    category_type: String,
    category: String,
    willingness_level: String,
}

/// Stores each dataset as `{type}_{name}_questions.csv` in one directory
#[derive(Debug, Clone)]
pub struct CsvCorpusStore {
    dir: PathBuf,
}

impl CsvCorpusStore {
    /// Create a store rooted at `dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the dataset files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the dataset file for a category
    ///
    /// Anything outside `[a-z0-9]` in the name becomes `_`, so every dataset
    /// stays directly inside [`Self::dir`].
    #[must_use]
    pub fn path_for(&self, category_type: CategoryType, name: &str) -> PathBuf {
        let sanitized: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{category_type}_{sanitized}_questions.csv"))
    }
}

impl CorpusStore for CsvCorpusStore {
    fn exists(&self, category_type: CategoryType, name: &str) -> bool {
        self.path_for(category_type, name).exists()
    }

    fn load(&self, category_type: CategoryType, name: &str) -> Result<Vec<QuestionTemplate>> {
        let path = self.path_for(category_type, name);
        let mut reader = csv::Reader::from_path(&path)?;

        let mut questions = Vec::new();
        for row in reader.deserialize::<QuestionRow>() {
            let row = row?;
            let tier = WillingnessTier::parse(&row.willingness_level).unwrap_or_else(|| {
                tracing::warn!(
                    path = %path.display(),
                    level = %row.willingness_level,
                    "unknown willingness level, treating as medium"
                );
                WillingnessTier::Medium
            });
            questions.push(QuestionTemplate {
                text: row.question,
                category_type,
                category_name: row.category,
                tier,
            });
        }

        tracing::debug!(
            path = %path.display(),
            count = questions.len(),
            "loaded question dataset"
        );
        Ok(questions)
    }

    fn save(
        &self,
        category_type: CategoryType,
        name: &str,
        questions: &[QuestionTemplate],
    ) -> Result<()> {
        let path = self.path_for(category_type, name);
        // Write to a sibling file first so readers never see a partial dataset
        let tmp = path.with_extension("csv.tmp");

        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for q in questions {
                writer.serialize(QuestionRow {
                    question: q.text.clone(),
                    category_type: category_type.to_string(),
                    category: name.to_string(),
                    willingness_level: q.tier.as_str().to_string(),
                })?;
            }
            writer.flush()?;
        }

        std::fs::rename(&tmp, &path)?;
        tracing::info!(path = %path.display(), count = questions.len(), "saved question dataset");
        Ok(())
    }
}

/// In-memory store, for text mode and tests
#[derive(Debug, Default)]
pub struct MemoryCorpusStore {
    datasets: Mutex<HashMap<CategoryKey, Vec<QuestionTemplate>>>,
}

impl MemoryCorpusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a dataset directly
    #[must_use]
    pub fn with_dataset(
        self,
        category_type: CategoryType,
        name: &str,
        questions: Vec<QuestionTemplate>,
    ) -> Self {
        if let Ok(mut datasets) = self.datasets.lock() {
            datasets.insert(CategoryKey::new(category_type, name), questions);
        }
        self
    }
}

impl CorpusStore for MemoryCorpusStore {
    fn exists(&self, category_type: CategoryType, name: &str) -> bool {
        self.datasets
            .lock()
            .is_ok_and(|d| d.contains_key(&CategoryKey::new(category_type, name)))
    }

    fn load(&self, category_type: CategoryType, name: &str) -> Result<Vec<QuestionTemplate>> {
        let key = CategoryKey::new(category_type, name);
        self.datasets
            .lock()
            .map_err(|_| Error::Generation("corpus store lock poisoned".to_string()))?
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Generation(format!("no dataset for {key}")))
    }

    fn save(
        &self,
        category_type: CategoryType,
        name: &str,
        questions: &[QuestionTemplate],
    ) -> Result<()> {
        self.datasets
            .lock()
            .map_err(|_| Error::Generation("corpus store lock poisoned".to_string()))?
            .insert(CategoryKey::new(category_type, name), questions.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::partition_by_tier;

    fn sample(category_type: CategoryType, name: &str) -> Vec<QuestionTemplate> {
        let texts = (0..6)
            .map(|i| format!("What part of {name} surprised you in year {i}?"))
            .collect();
        partition_by_tier(texts, category_type, name)
    }

    #[test]
    fn csv_store_persists_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCorpusStore::new(dir.path()).unwrap();

        assert!(!store.exists(CategoryType::Hobby, "rock climbing"));
        store
            .save(CategoryType::Hobby, "rock climbing", &sample(CategoryType::Hobby, "rock climbing"))
            .unwrap();
        assert!(store.exists(CategoryType::Hobby, "rock climbing"));

        let loaded = store.load(CategoryType::Hobby, "rock climbing").unwrap();
        assert_eq!(loaded, sample(CategoryType::Hobby, "rock climbing"));
    }

    #[test]
    fn csv_path_is_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvCorpusStore::new(dir.path()).unwrap();
        let path = store.path_for(CategoryType::Subcategory, "Data Scientist");
        assert!(path.ends_with("subcategory_data_scientist_questions.csv"));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCorpusStore::new();
        assert!(store.load(CategoryType::Main, "engineering").is_err());

        store
            .save(CategoryType::Main, "engineering", &sample(CategoryType::Main, "engineering"))
            .unwrap();
        assert!(store.exists(CategoryType::Main, "engineering"));
        assert!(!store.exists(CategoryType::Hobby, "engineering"));
    }
}
