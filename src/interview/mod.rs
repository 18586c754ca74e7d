//! Interview orchestration
//!
//! [`Interviewer`] walks one session through its phases:
//!
//! 1. Professional: six fixed slots alternating profession and industry
//!    questions, each with at most one follow-up round
//! 2. Hobby discovery: one open question, hobbies extracted from the answer
//! 3. Hobby deep dive: three questions about the first hobby, while a
//!    dataset for it is generated in the background
//! 4. Conclusion: gap statistics, a feedback question, a closing line
//!
//! A quit phrase, ctrl-c or a terminal collaborator error moves the session
//! to `Aborted` from any phase. Timing collected so far is still flushed.

pub mod intake;
pub mod lines;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;

use crate::corpus::{AskedSet, CategoryType, CorpusManager, QuestionTemplate, Readiness};
use crate::followup::FollowupUnit;
use crate::ports::{
    Answer, AnswerSource, Captured, Expect, HobbyExtractor, Presented, Presenter, ResponseSink,
    SessionInfo,
};
use crate::telemetry::{AnswerRecord, EventKind, GapSummary, Phase, TimingLog};
use crate::willingness::{WillingnessEstimator, WillingnessState};
use crate::{Error, Result};

pub use intake::Profile;

/// Category types of the professional slots, in order
pub const PROFESSIONAL_SEQUENCE: [CategoryType; 6] = [
    CategoryType::Subcategory,
    CategoryType::Main,
    CategoryType::Subcategory,
    CategoryType::Subcategory,
    CategoryType::Main,
    CategoryType::Subcategory,
];

/// Questions asked about the chosen hobby
pub const HOBBY_ITERATIONS: u8 = 3;

/// Recorded in place of an empty answer
const NO_RESPONSE: &str = "[No response]";

/// Where a session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    Professional,
    HobbyDiscovery,
    /// Iteration index, 0-based
    HobbyDeepDive(u8),
    Conclusion,
    /// Finished normally
    Complete,
    Aborted,
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Professional => f.write_str("professional"),
            Self::HobbyDiscovery => f.write_str("hobby_discovery"),
            Self::HobbyDeepDive(i) => write!(f, "hobby_deep_dive[{i}]"),
            Self::Conclusion => f.write_str("conclusion"),
            Self::Complete => f.write_str("complete"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

/// Why a session was cut short
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The speaker used an exit phrase
    Quit,
    /// Ctrl-c, or the input closed
    Interrupted,
    /// A collaborator failed beyond recovery
    Failure,
}

/// Session tuning
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long hobby iteration 1 waits for the hobby dataset
    pub readiness_timeout: Duration,
    /// Start generating missing profession datasets when the session begins
    pub prepare_profession_corpus: bool,
    /// Race each capture against ctrl-c
    pub catch_interrupt: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(3),
            prepare_profession_corpus: true,
            catch_interrupt: true,
        }
    }
}

/// Everything an interviewer talks to
pub struct Collaborators {
    pub corpus: CorpusManager,
    pub followup: FollowupUnit,
    pub estimator: WillingnessEstimator,
    pub hobbies: Box<dyn HobbyExtractor>,
    pub presenter: Box<dyn Presenter>,
    pub source: Box<dyn AnswerSource>,
    pub sink: Box<dyn ResponseSink>,
}

/// Per-session mutable state
#[derive(Debug, Default)]
struct PhaseState {
    willingness: WillingnessState,
    asked: AskedSet,
    previous_was_followup: bool,
    /// Completion of the last answer in the current gap-accounting scope
    last_completion: Option<DateTime<Utc>>,
    question_count: usize,
}

/// Outcome of one session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// `Complete` or `Aborted`
    pub state: InterviewState,
    pub abort_reason: Option<AbortReason>,
    /// Primary questions asked, in order; follow-ups excluded
    pub questions: Vec<QuestionTemplate>,
    pub hobby: Option<String>,
    pub willingness: WillingnessState,
    pub gaps: GapSummary,
}

impl SessionReport {
    #[must_use]
    pub const fn completed(&self) -> bool {
        matches!(self.state, InterviewState::Complete)
    }
}

/// Control flow out of a step
enum Step {
    Continue,
    Abort(AbortReason),
}

/// Drives one interview session
pub struct Interviewer {
    corpus: CorpusManager,
    followup: FollowupUnit,
    estimator: WillingnessEstimator,
    hobbies: Box<dyn HobbyExtractor>,
    presenter: Box<dyn Presenter>,
    source: Box<dyn AnswerSource>,
    sink: Box<dyn ResponseSink>,
    rng: StdRng,
    config: SessionConfig,
    state: InterviewState,
    phase: PhaseState,
    log: TimingLog,
    questions: Vec<QuestionTemplate>,
}

impl Interviewer {
    #[must_use]
    pub fn new(parts: Collaborators, config: SessionConfig, rng: StdRng) -> Self {
        Self {
            corpus: parts.corpus,
            followup: parts.followup,
            estimator: parts.estimator,
            hobbies: parts.hobbies,
            presenter: parts.presenter,
            source: parts.source,
            sink: parts.sink,
            rng,
            config,
            state: InterviewState::Professional,
            phase: PhaseState::default(),
            log: TimingLog::new(),
            questions: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> InterviewState {
        self.state
    }

    #[must_use]
    pub const fn willingness(&self) -> WillingnessState {
        self.phase.willingness
    }

    #[must_use]
    pub const fn timing(&self) -> &TimingLog {
        &self.log
    }

    /// Run the whole session for `profile`
    ///
    /// # Errors
    ///
    /// Returns error only if the timing log cannot be flushed; everything
    /// else is handled inside the session or reported as an abort.
    pub async fn run(&mut self, profile: &Profile) -> Result<SessionReport> {
        let session = SessionInfo::new(&profile.name, Utc::now());
        self.presenter.begin_session(&session);
        self.source.begin_session(&session);
        if let Err(e) = self.sink.begin_session(&session) {
            tracing::warn!(error = %e, "failed to prepare response storage");
        }
        tracing::info!(
            user = %profile.name,
            main_category = %profile.main_category,
            subcategory = %profile.subcategory,
            "interview started"
        );

        if self.config.prepare_profession_corpus {
            self.prepare_corpus(profile);
        }

        let mut hobby = None;
        let end = match self.run_phases(profile, &mut hobby).await {
            Ok(Step::Continue) => None,
            Ok(Step::Abort(reason)) => Some(reason),
            Err(e) => {
                tracing::error!(error = %e, "unrecoverable error, ending interview");
                Some(if matches!(e, Error::Terminated) {
                    AbortReason::Interrupted
                } else {
                    AbortReason::Failure
                })
            }
        };

        let gaps = GapSummary::from_log(&self.log);
        match end {
            None => {
                self.enter(InterviewState::Complete);
                self.sink.flush_timing(&self.log, &gaps, false)?;
            }
            Some(reason) => {
                self.enter(InterviewState::Aborted);
                tracing::info!(?reason, questions = self.questions.len(), "interview aborted");
                if reason == AbortReason::Quit
                    && let Err(e) = self.presenter.present(lines::QUIT_MESSAGE, "quit").await
                {
                    tracing::debug!(error = %e, "quit message not delivered");
                }
                self.sink.flush_timing(&self.log, &gaps, true)?;
            }
        }

        Ok(SessionReport {
            state: self.state,
            abort_reason: end,
            questions: self.questions.clone(),
            hobby,
            willingness: self.phase.willingness,
            gaps,
        })
    }

    fn prepare_corpus(&self, profile: &Profile) {
        for (category_type, name) in [
            (CategoryType::Main, profile.main_category.as_str()),
            (CategoryType::Subcategory, profile.subcategory.as_str()),
        ] {
            if !name.is_empty() && !self.corpus.is_available(category_type, name) {
                // Abandoned if the session ends first
                let _ = self.corpus.generate_async(category_type, name);
            }
        }
    }

    async fn run_phases(&mut self, profile: &Profile, hobby: &mut Option<String>) -> Result<Step> {
        self.enter(InterviewState::Professional);
        // Intake answers do not count towards gaps
        self.phase.last_completion = None;
        self.say(&lines::begin(&profile.name), "begin", Phase::Professional).await?;
        self.say(lines::INSTRUCTIONS, "instructions", Phase::Professional).await?;

        for (slot, category_type) in PROFESSIONAL_SEQUENCE.into_iter().enumerate() {
            let name = match category_type {
                CategoryType::Main => profile.main_category.as_str(),
                _ => profile.subcategory.as_str(),
            };
            let result = self.professional_slot(slot, category_type, name).await;
            if let Step::Abort(reason) = tolerate(result, "professional slot")? {
                return Ok(Step::Abort(reason));
            }
        }

        self.enter(InterviewState::HobbyDiscovery);
        let hobbies = match self.hobby_discovery(profile).await {
            Ok(Some(hobbies)) => hobbies,
            Ok(None) => return Ok(Step::Abort(AbortReason::Quit)),
            Err(e) if e.is_terminal() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "hobby discovery failed, moving on");
                Vec::new()
            }
        };

        if let Some(selected) = hobbies.first().cloned() {
            if let Step::Abort(reason) = self.hobby_deep_dive(&hobbies, &selected).await? {
                return Ok(Step::Abort(reason));
            }
            *hobby = Some(selected);
        } else {
            tracing::info!("no hobbies mentioned, skipping deep dive");
        }

        self.enter(InterviewState::Conclusion);
        self.conclusion(profile).await
    }

    fn enter(&mut self, state: InterviewState) {
        tracing::debug!(from = %self.state, to = %state, "interview state");
        self.state = state;
    }

    /// Present a line that expects no answer
    async fn say(&mut self, text: &str, label: &str, phase: Phase) -> Result<()> {
        match self.presenter.present(text, label).await {
            Ok(presented) => {
                self.log.mark(phase, EventKind::Introduction, label, presented.first_audible_at);
                Ok(())
            }
            Err(e) if e.is_terminal() => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, label, "line not delivered");
                Ok(())
            }
        }
    }

    /// Wait for an answer, racing ctrl-c when configured
    async fn listen(&mut self, question_id: &str, expect: Expect) -> Result<Captured> {
        if !self.config.catch_interrupt {
            return self.source.capture(question_id, expect).await;
        }

        tokio::select! {
            captured = self.source.capture(question_id, expect) => captured,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!(question_id, "interrupted");
                Err(Error::Terminated)
            }
        }
    }

    /// Present a prompt, record its timing and gap
    async fn ask(
        &mut self,
        phase: Phase,
        text: &str,
        recording_id: &str,
        gap: bool,
    ) -> Result<Presented> {
        let presented = self.presenter.present(text, recording_id).await?;
        self.log.mark(
            phase,
            EventKind::FirstAudible,
            format!("{recording_id}_first_audible"),
            presented.first_audible_at,
        );

        if gap && let Some(last) = self.phase.last_completion {
            let seconds = self.log.gap(
                phase,
                format!("{recording_id}_gap"),
                last,
                presented.first_audible_at,
            );
            tracing::debug!(recording_id, gap = seconds, "response-to-prompt gap");
        }
        Ok(presented)
    }

    /// Capture an answer and mark its completion; `None` on quit
    async fn answer(&mut self, phase: Phase, question_id: &str) -> Result<Option<Answer>> {
        let expect = if phase == Phase::Intake {
            Expect::Brief
        } else {
            Expect::Answer
        };
        let Captured::Answer(answer) = self.listen(question_id, expect).await? else {
            tracing::info!(question_id, "quit requested");
            return Ok(None);
        };

        self.log.mark(
            phase,
            EventKind::ResponseCompletion,
            format!("{question_id}_response_end"),
            answer.completed_at,
        );
        self.phase.last_completion = Some(answer.completed_at);
        Ok(Some(answer))
    }

    fn record(
        &mut self,
        recording_id: &str,
        question: &QuestionTemplate,
        text: &str,
        answer: &Answer,
        presented: &Presented,
    ) {
        let text = if text.trim().is_empty() { NO_RESPONSE } else { text };
        let record =
            AnswerRecord::new(recording_id, question, text, answer, presented.audio_ref.clone());
        if let Err(e) = self.sink.record_answer(&record) {
            tracing::warn!(recording_id, error = %e, "failed to record answer");
        }
    }

    /// Re-score willingness from the answer audio
    fn rescore(&mut self, answer: &Answer) {
        // Typed answers carry no signal to score
        if !answer.has_audio_channel() {
            return;
        }
        let estimate = self.estimator.estimate(&answer.samples, answer.sample_rate);
        self.phase.willingness.update(&estimate);
        tracing::info!(
            tier = %estimate.tier,
            score = estimate.score,
            "willingness updated"
        );
    }

    fn next_question_id(&mut self, suffix: &str) -> String {
        self.phase.question_count += 1;
        format!("q{}_{suffix}", self.phase.question_count)
    }

    async fn professional_slot(
        &mut self,
        slot: usize,
        category_type: CategoryType,
        name: &str,
    ) -> Result<Step> {
        let id = self.next_question_id(category_type.as_str());
        self.log.mark(
            Phase::Professional,
            EventKind::QuestionPreparation,
            format!("{id}_prep"),
            Utc::now(),
        );

        let question = self.corpus.select_question(
            &mut self.phase.asked,
            category_type,
            name,
            self.phase.willingness.tier,
        );
        self.questions.push(question.clone());
        tracing::info!(slot, category = %category_type, tier = %question.tier, "asking question");

        let presented = self.ask(Phase::Professional, &question.text, &id, true).await?;
        let Some(answer) = self.answer(Phase::Professional, &id).await? else {
            return Ok(Step::Abort(AbortReason::Quit));
        };

        let mut full_text = answer.text.clone();
        let mut followed_up = false;

        if !answer.text.is_empty()
            && self.followup.should_follow_up(&answer.text, self.phase.previous_was_followup)
            && let Some(followup) = self.followup.generate(&answer.text).await
        {
            let followup_id = format!("{id}_followup");
            self.log.mark(
                Phase::Professional,
                EventKind::QuestionPreparation,
                format!("{followup_id}_prep"),
                Utc::now(),
            );
            self.ask(Phase::Professional, &followup, &followup_id, true).await?;
            let Some(reply) = self.answer(Phase::Professional, &followup_id).await? else {
                return Ok(Step::Abort(AbortReason::Quit));
            };
            if !reply.text.is_empty() {
                full_text = format!("{full_text}\n\n[Follow-up] {followup}\n{}", reply.text);
            }
            followed_up = true;
        }
        self.phase.previous_was_followup = followed_up;

        self.record(&id, &question, &full_text, &answer, &presented);
        self.rescore(&answer);
        Ok(Step::Continue)
    }

    /// Ask about hobbies; `Ok(None)` on quit
    async fn hobby_discovery(&mut self, profile: &Profile) -> Result<Option<Vec<String>>> {
        // No gap is measured across the phase boundary
        self.phase.last_completion = None;

        self.say(lines::HOBBY_TRANSITION, "hobby_transition", Phase::HobbyDiscovery).await?;

        let text = lines::hobby_discovery_question(&mut self.rng, &profile.name);
        let id = "hobby_discovery";
        let presented = self.ask(Phase::HobbyDiscovery, &text, id, false).await?;
        let Some(answer) = self.answer(Phase::HobbyDiscovery, id).await? else {
            return Ok(None);
        };

        let hobbies = if answer.text.is_empty() {
            Vec::new()
        } else {
            self.hobbies.extract(&answer.text)
        };
        tracing::info!(?hobbies, "hobbies extracted");

        let question = QuestionTemplate {
            text,
            category_type: CategoryType::Hobby,
            category_name: "Personal Interests".to_string(),
            tier: self.phase.willingness.tier,
        };
        self.record(id, &question, &answer.text, &answer, &presented);
        Ok(Some(hobbies))
    }

    async fn hobby_deep_dive(&mut self, hobbies: &[String], selected: &str) -> Result<Step> {
        self.say(&lines::hobby_intro(hobbies, selected), "hobby_intro", Phase::HobbyQuestions)
            .await?;

        // Fresh gap accounting for this phase
        self.phase.last_completion = None;
        self.phase.previous_was_followup = false;

        let readiness = self.corpus.generate_async(CategoryType::Hobby, selected);
        let mut readiness = Some(readiness);

        for iteration in 0..HOBBY_ITERATIONS {
            self.enter(InterviewState::HobbyDeepDive(iteration));
            let result = self.hobby_iteration(iteration, selected, &mut readiness).await;
            if let Step::Abort(reason) = tolerate(result, "hobby question")? {
                return Ok(Step::Abort(reason));
            }
        }
        Ok(Step::Continue)
    }

    async fn hobby_iteration(
        &mut self,
        iteration: u8,
        hobby: &str,
        readiness: &mut Option<Readiness>,
    ) -> Result<Step> {
        let id = self.next_question_id("hobby");
        let prepared_at = Utc::now();
        self.log.mark(
            Phase::HobbyQuestions,
            EventKind::QuestionPreparation,
            format!("{id}_prep"),
            prepared_at,
        );

        let measure = iteration > 0;
        if measure && let Some(last) = self.phase.last_completion {
            self.log.gap(Phase::HobbyQuestions, format!("{id}_prep_gap"), last, prepared_at);
        }

        let question = if iteration == 0 {
            self.corpus.first_default(&mut self.phase.asked, CategoryType::Hobby, hobby)
        } else {
            if let Some(pending) = readiness.take() {
                let ready = pending.wait(self.config.readiness_timeout).await;
                tracing::info!(hobby, ready, "hobby dataset readiness");
            }
            self.corpus.select_question(
                &mut self.phase.asked,
                CategoryType::Hobby,
                hobby,
                self.phase.willingness.tier,
            )
        };
        self.questions.push(question.clone());

        let presented = self.ask(Phase::HobbyQuestions, &question.text, &id, measure).await?;
        let Some(answer) = self.answer(Phase::HobbyQuestions, &id).await? else {
            return Ok(Step::Abort(AbortReason::Quit));
        };

        self.record(&id, &question, &answer.text, &answer, &presented);
        self.rescore(&answer);
        Ok(Step::Continue)
    }

    async fn conclusion(&mut self, profile: &Profile) -> Result<Step> {
        let summary = GapSummary::from_log(&self.log);
        if let Some(overall) = summary.overall {
            tracing::info!(
                count = overall.count,
                mean = overall.mean,
                min = overall.min,
                max = overall.max,
                stddev = overall.stddev,
                "response-to-prompt gaps"
            );
        }

        let result = self.feedback(profile).await;
        if let Step::Abort(reason) = tolerate(result, "feedback question")? {
            return Ok(Step::Abort(reason));
        }

        self.say(&lines::closing(&profile.name), "closing", Phase::Conclusion).await?;
        Ok(Step::Continue)
    }

    async fn feedback(&mut self, profile: &Profile) -> Result<Step> {
        let text = lines::feedback_question(&mut self.rng, &profile.name);
        let question = QuestionTemplate {
            text,
            category_type: CategoryType::Feedback,
            category_name: "feedback".to_string(),
            tier: self.phase.willingness.tier,
        };
        let id = "feedback";

        let presented = self.ask(Phase::Conclusion, &question.text, id, false).await?;
        let Some(answer) = self.answer(Phase::Conclusion, id).await? else {
            return Ok(Step::Abort(AbortReason::Quit));
        };
        if !answer.text.is_empty() {
            self.record(id, &question, &answer.text, &answer, &presented);
        }
        Ok(Step::Continue)
    }
}

/// Keep going past a failed step unless the failure is terminal
fn tolerate(result: Result<Step>, what: &str) -> Result<Step> {
    match result {
        Err(e) if !e.is_terminal() => {
            tracing::warn!(step = what, error = %e, "step failed, moving on");
            Ok(Step::Continue)
        }
        other => other,
    }
}
