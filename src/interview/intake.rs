//! Getting to know the speaker before the interview proper

use serde::Serialize;

use super::{Interviewer, lines};
use crate::extract::{extract_name, parse_number, title_case};
use crate::ports::{ProfessionCategories, ProfessionClassifier};
use crate::Result;
use crate::telemetry::Phase;

const NAME_ATTEMPTS: usize = 3;
const PROFESSION_ATTEMPTS: usize = 3;
const EXPERIENCE_ATTEMPTS: usize = 3;

/// Industry used when a profession was never recognised
const UNRECOGNISED_INDUSTRY: &str = "General";

/// Who is being interviewed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    /// Profession as the speaker phrased it
    pub profession: String,
    pub main_category: String,
    pub subcategory: String,
    pub years_experience: u32,
}

impl Interviewer {
    /// Greet the speaker and collect name, profession and experience
    ///
    /// Pass `name` to skip asking for it. Returns `None` if the speaker quit.
    ///
    /// # Errors
    ///
    /// Returns error if a collaborator fails beyond recovery
    pub async fn intake(
        &mut self,
        classifier: &dyn ProfessionClassifier,
        name: Option<String>,
    ) -> Result<Option<Profile>> {
        let profile = self.collect_profile(classifier, name).await?;
        if profile.is_none()
            && let Err(e) = self.presenter.present(lines::QUIT_MESSAGE, "quit").await
        {
            tracing::debug!(error = %e, "quit message not delivered");
        }
        Ok(profile)
    }

    async fn collect_profile(
        &mut self,
        classifier: &dyn ProfessionClassifier,
        name: Option<String>,
    ) -> Result<Option<Profile>> {
        let greeting = lines::greeting(&mut self.rng);
        self.say(&greeting, "greeting", Phase::Intake).await?;
        let intro = lines::introduction(&mut self.rng);
        self.say(&intro, "ai_introduction", Phase::Intake).await?;

        let name = match name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None => match self.ask_name().await? {
                Some(name) => name,
                None => return Ok(None),
            },
        };

        let welcome = lines::welcome(&mut self.rng, &name);
        self.say(&welcome, "welcome", Phase::Intake).await?;
        let opener = lines::opener(&mut self.rng);
        self.say(&opener, "opener", Phase::Intake).await?;

        let Some((profession, categories, years)) = self.ask_profession(classifier, &name).await?
        else {
            return Ok(None);
        };

        tracing::info!(
            name = %name,
            main_category = %categories.main_category,
            subcategory = %categories.subcategory,
            years,
            "profile collected"
        );

        Ok(Some(Profile {
            name,
            profession,
            main_category: categories.main_category,
            subcategory: categories.subcategory,
            years_experience: years,
        }))
    }

    /// Typed transcript of one intake answer; `None` on quit
    async fn intake_answer(&mut self, prompt: &str, id: &str) -> Result<Option<String>> {
        self.ask(Phase::Intake, prompt, id, false).await?;
        Ok(self
            .answer(Phase::Intake, id)
            .await?
            .map(|answer| answer.text.trim().to_string()))
    }

    async fn ask_name(&mut self) -> Result<Option<String>> {
        let mut prompt = lines::name_question(&mut self.rng);
        for attempt in 1..=NAME_ATTEMPTS {
            let Some(text) = self.intake_answer(&prompt, "name_prompt").await? else {
                return Ok(None);
            };
            if let Some(name) = extract_name(&text) {
                return Ok(Some(name));
            }
            tracing::debug!(attempt, "no name heard");
            prompt = lines::NAME_REPROMPT.to_string();
        }
        Ok(Some(lines::DEFAULT_NAME.to_string()))
    }

    async fn ask_experience(&mut self, name: &str) -> Result<Option<u32>> {
        let mut prompt = lines::experience_question(&mut self.rng, name);
        for attempt in 1..=EXPERIENCE_ATTEMPTS {
            let id = format!("experience_{attempt}");
            let Some(text) = self.intake_answer(&prompt, &id).await? else {
                return Ok(None);
            };
            match parse_number(&text) {
                Some(years) if years >= 0.0 => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let whole = years.floor() as u32;
                    return Ok(Some(whole));
                }
                Some(_) => prompt = lines::NEGATIVE_EXPERIENCE.to_string(),
                None => prompt = lines::EXPERIENCE_REPROMPT.to_string(),
            }
        }
        tracing::warn!("no usable years of experience, assuming 0");
        Ok(Some(0))
    }

    async fn ask_profession(
        &mut self,
        classifier: &dyn ProfessionClassifier,
        name: &str,
    ) -> Result<Option<(String, ProfessionCategories, u32)>> {
        let mut prompt = lines::profession_question(&mut self.rng, name);
        let mut last = (String::new(), 0);

        for attempt in 1..=PROFESSION_ATTEMPTS {
            let Some(profession) = self.intake_answer(&prompt, "profession").await? else {
                return Ok(None);
            };
            let profession = profession.to_lowercase();
            if profession.is_empty() {
                prompt = lines::PROFESSION_REPROMPT.to_string();
                continue;
            }

            let Some(years) = self.ask_experience(name).await? else {
                return Ok(None);
            };

            if let Some(categories) = classifier.classify(&profession, Some(years)) {
                return Ok(Some((profession, categories, years)));
            }

            tracing::info!(attempt, profession = %profession, "profession not recognised");
            prompt = lines::UNKNOWN_PROFESSION.to_string();
            last = (profession, years);
        }

        let (profession, years) = last;
        let subcategory = if profession.is_empty() {
            UNRECOGNISED_INDUSTRY.to_string()
        } else {
            title_case(&profession)
        };
        tracing::warn!(subcategory = %subcategory, "using unrecognised profession as is");
        Ok(Some((
            profession,
            ProfessionCategories {
                main_category: UNRECOGNISED_INDUSTRY.to_string(),
                subcategory,
            },
            years,
        )))
    }
}
