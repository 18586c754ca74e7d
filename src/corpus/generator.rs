//! Question dataset generation through a language model

use std::sync::Arc;

use async_trait::async_trait;

use super::{CategoryType, QuestionTemplate, partition_by_tier};
use crate::ports::{LanguageModel, QuestionGenerator};
use crate::{Error, Result};

/// Questions kept per dataset (25 per tier)
pub const MAX_BATCH: usize = 75;

/// Token budget for one generation request
const GENERATION_MAX_TOKENS: u32 = 4000;

/// Accepted question length in words
const MIN_WORDS: usize = 8;
const MAX_WORDS: usize = 15;

/// Words too common to signal overlap between two questions
const COMMON_WORDS: [&str; 14] = [
    "about", "would", "could", "think", "there", "their", "where", "when", "what", "that", "have",
    "your", "with", "this",
];

/// Generates datasets by prompting a [`LanguageModel`]
pub struct LlmQuestionGenerator {
    llm: Arc<dyn LanguageModel>,
}

impl LlmQuestionGenerator {
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    async fn request(&self, prompt: &str) -> Result<Vec<String>> {
        let text = self.llm.complete(prompt, GENERATION_MAX_TOKENS).await?;
        Ok(parse_questions(&text))
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate_batch(
        &self,
        category_type: CategoryType,
        category_name: &str,
    ) -> Result<Vec<QuestionTemplate>> {
        let prompt = base_prompt(category_type, category_name, MAX_BATCH);
        let mut questions = dedupe(self.request(&prompt).await?);

        tracing::debug!(
            category_type = %category_type,
            category = category_name,
            count = questions.len(),
            "initial question batch"
        );

        // Two top-up rounds, the second with a stricter overlap threshold
        for max_shared in [3, 2] {
            if questions.len() >= MAX_BATCH {
                break;
            }

            let prompt = top_up_prompt(category_name, MAX_BATCH - questions.len(), &questions);
            match self.request(&prompt).await {
                Ok(extra) => {
                    for candidate in extra {
                        if !too_similar(&candidate, &questions, max_shared) {
                            questions.push(candidate);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, category = category_name, "top-up generation failed");
                    break;
                }
            }
        }

        let mut usable: Vec<String> = questions
            .into_iter()
            .filter(|q| (MIN_WORDS..=MAX_WORDS).contains(&q.split_whitespace().count()))
            .collect();
        usable.sort_by_key(|q| q.split_whitespace().count());
        usable.truncate(MAX_BATCH);

        if usable.is_empty() {
            return Err(Error::Generation(format!(
                "no usable questions generated for {category_type}: {category_name}"
            )));
        }

        Ok(partition_by_tier(usable, category_type, category_name))
    }
}

/// Keep lines that look like questions, stripped of numbering and bullets
fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| {
                    c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | '"' | '\'' | ' ')
                })
                .trim_end_matches(['"', '\''])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty() && line.contains('?'))
        .collect()
}

fn dedupe(questions: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    questions
        .into_iter()
        .filter(|q| seen.insert(q.to_lowercase()))
        .collect()
}

fn significant_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 4 && !COMMON_WORDS.contains(w))
        .map(ToString::to_string)
        .collect()
}

/// Whether `candidate` overlaps an existing question too much
fn too_similar(candidate: &str, existing: &[String], max_shared: usize) -> bool {
    let candidate_lower = candidate.to_lowercase();
    let candidate_words = significant_words(candidate);

    existing.iter().any(|e| {
        let e_lower = e.to_lowercase();
        if e_lower == candidate_lower {
            return true;
        }

        let e_words = significant_words(e);
        let shared = candidate_words.iter().filter(|w| e_words.contains(w)).count();
        let prefix: String = e_lower.chars().take(15).collect();

        shared >= max_shared || (e_lower.len() > 20 && candidate_lower.starts_with(&prefix))
    })
}

fn base_prompt(category_type: CategoryType, category: &str, count: usize) -> String {
    let (subject, explore) = match category_type {
        CategoryType::Subcategory => (
            format!("the profession: {category}"),
            format!(
                "- Day-to-day realities of working in {category}\n\
                 - Career development and professional growth\n\
                 - Challenges and rewards of the profession\n\
                 - Skills and traits needed for success\n\
                 - Industry changes and adaptations"
            ),
        ),
        CategoryType::Hobby => (
            format!("the hobby: {category}"),
            "- Experience levels and skills\n\
             - Personal discoveries and learning\n\
             - Meaning and fulfillment\n\
             - Memorable moments and challenges\n\
             - Social connections through the hobby"
                .to_string(),
        ),
        CategoryType::Main | CategoryType::Feedback | CategoryType::General => (
            format!("the field: {category}"),
            "- Life domains (work, relationships, personal)\n\
             - Time periods (past, present, future)\n\
             - Emotional contexts (challenges, joys, surprises)\n\
             - Social contexts (alone, with others)\n\
             - Aspects (benefits, challenges, evolution)"
                .to_string(),
        ),
    };

    format!(
        "Generate {count} unique conversational questions about {subject}.\n\n\
         REQUIREMENTS:\n\
         - Questions MUST be {MIN_WORDS}-{MAX_WORDS} words each\n\
         - Sound like two people talking, not an interview\n\
         - Respectful but not overly formal\n\
         - Each question explores a DIFFERENT aspect of {category}\n\
         - No lengthy setups or explanations\n\n\
         Questions should explore different:\n{explore}\n\n\
         FORMAT: One short question per line, no numbering."
    )
}

fn top_up_prompt(category: &str, count: usize, existing: &[String]) -> String {
    let examples = existing
        .iter()
        .take(15)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate {count} COMPLETELY UNIQUE questions about {category}.\n\n\
         REQUIREMENTS:\n\
         - Each question MUST be only {MIN_WORDS}-{MAX_WORDS} words\n\
         - Sound like one person naturally asking another\n\
         - Use different sentence structures and words than these:\n{examples}\n\n\
         FORMAT: One short question per line, no numbering."
    )
}
