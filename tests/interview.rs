//! Whole-session tests driven by scripted collaborators

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    FixedModel, Reply, SlowGenerator, corpus, harness, loud_tone, offline_corpus, profile, silence,
    test_config,
};

use cadence_interview::extract::KeywordProfessionClassifier;
use cadence_interview::interview::{PROFESSIONAL_SEQUENCE, lines};
use cadence_interview::{
    AbortReason, CategoryType, GateMode, InterviewState, MemoryCorpusStore, WillingnessTier,
};

const SHORT: &str = "It has been a good run so far";
const HOBBIES: &str = "I really enjoy rock climbing, and on weekends I love playing chess.";
const LONG: &str = "I spent most of last year rebuilding our deployment pipeline from scratch, \
    which meant learning a lot about containers, caching, and how teams actually ship software.";
const FOLLOWUP: &str = "What was the hardest part of rebuilding that pipeline for you?";

fn professional_answers() -> Vec<Reply> {
    vec![Reply::Text(SHORT); PROFESSIONAL_SEQUENCE.len()]
}

fn full_script() -> Vec<Reply> {
    let mut replies = professional_answers();
    replies.push(Reply::Text(HOBBIES));
    replies.extend([Reply::Text(SHORT), Reply::Text(SHORT), Reply::Text(SHORT)]);
    replies.push(Reply::Text("Quick and friendly, thanks"));
    replies
}

#[tokio::test]
async fn full_session_runs_every_phase() {
    let mut h = harness(
        offline_corpus(),
        full_script(),
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert!(report.completed());
    assert_eq!(report.state, InterviewState::Complete);
    assert_eq!(report.abort_reason, None);
    assert_eq!(report.hobby.as_deref(), Some("playing chess"));

    let types: Vec<CategoryType> = report.questions[..6].iter().map(|q| q.category_type).collect();
    assert_eq!(types, PROFESSIONAL_SEQUENCE);
    assert_eq!(report.questions.len(), 9);
    assert_eq!(
        report.questions[6].text,
        "What first caught your interest in playing chess?"
    );

    let mut texts: Vec<&str> = report.questions.iter().map(|q| q.text.as_str()).collect();
    texts.sort_unstable();
    texts.dedup();
    assert_eq!(texts.len(), 9, "no question is asked twice");

    let asked = h.asked.lock().unwrap().clone();
    assert_eq!(asked[0], "q1_subcategory");
    assert_eq!(asked[1], "q2_main");
    assert_eq!(asked[6], "hobby_discovery");
    assert_eq!(asked[7], "q7_hobby");
    assert_eq!(asked.last().map(String::as_str), Some("feedback"));

    // Six professional, discovery, three hobby, feedback
    assert_eq!(h.sink.records.lock().unwrap().len(), 11);
    assert_eq!(*h.sink.flushes.lock().unwrap(), vec![false]);

    let lines_seen = h.lines.lock().unwrap().clone();
    assert!(lines_seen.iter().any(|l| l == lines::HOBBY_TRANSITION));
    assert!(lines_seen.iter().any(|l| l.contains("rock climbing")));
    assert_eq!(lines_seen.last(), Some(&lines::closing("Ada")));
}

#[tokio::test]
async fn gaps_skip_phase_boundaries() {
    let mut h = harness(
        offline_corpus(),
        full_script(),
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    // First slot of each phase has nothing to measure against
    assert_eq!(report.gaps.professional_gaps.len(), 5);
    // Two prep gaps and two prompt gaps
    assert_eq!(report.gaps.hobby_gaps.len(), 4);
    assert!(report.gaps.overall.is_some());
    assert!(report.gaps.professional_gaps.iter().all(|g| *g >= 0.0));
}

#[tokio::test]
async fn session_hooks_see_the_speaker() {
    let mut h = harness(
        offline_corpus(),
        full_script(),
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    h.interviewer.run(&profile()).await.unwrap();

    let sessions = h.sessions.lock().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].user, "Ada");
    assert_eq!(sessions[0].user_slug(), "ada");
}

#[tokio::test]
async fn quit_stops_before_the_next_question() {
    let replies = vec![Reply::Text(SHORT), Reply::Text(SHORT), Reply::Quit];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert_eq!(report.state, InterviewState::Aborted);
    assert_eq!(report.abort_reason, Some(AbortReason::Quit));
    assert_eq!(report.questions.len(), 3);
    assert_eq!(h.asked.lock().unwrap().len(), 3);
    assert_eq!(h.sink.records.lock().unwrap().len(), 2);
    assert_eq!(*h.sink.flushes.lock().unwrap(), vec![true]);
    assert_eq!(
        h.lines.lock().unwrap().last().map(String::as_str),
        Some(lines::QUIT_MESSAGE)
    );
}

#[tokio::test]
async fn failed_answer_skips_to_the_next_slot() {
    let mut replies = full_script();
    replies[1] = Reply::Unavailable;

    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert!(report.completed());
    assert_eq!(report.abort_reason, None);
    assert_eq!(report.questions.len(), 9);

    let asked = h.asked.lock().unwrap().clone();
    assert_eq!(asked[1], "q2_main");
    assert!(asked[2].starts_with("q3_"));
    assert_eq!(asked.last().map(String::as_str), Some("feedback"));

    // The failed slot leaves no record
    assert_eq!(h.sink.records.lock().unwrap().len(), 10);
    assert_eq!(*h.sink.flushes.lock().unwrap(), vec![false]);
}

#[tokio::test]
async fn lost_microphone_ends_the_session() {
    let replies = vec![Reply::Text(SHORT), Reply::DeviceLost, Reply::Text(SHORT)];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert_eq!(report.state, InterviewState::Aborted);
    assert_eq!(report.abort_reason, Some(AbortReason::Failure));
    assert_eq!(h.asked.lock().unwrap().len(), 2);
    assert_eq!(h.sink.records.lock().unwrap().len(), 1);
    assert_eq!(*h.sink.flushes.lock().unwrap(), vec![true]);
    assert!(!h.lines.lock().unwrap().iter().any(|l| l == lines::QUIT_MESSAGE));
}

#[tokio::test]
async fn closed_input_interrupts_the_session() {
    let replies = vec![Reply::Text(SHORT), Reply::Text(SHORT)];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert_eq!(report.abort_reason, Some(AbortReason::Interrupted));
    assert_eq!(h.sink.records.lock().unwrap().len(), 2);
    assert_eq!(*h.sink.flushes.lock().unwrap(), vec![true]);
    assert!(
        !h.lines.lock().unwrap().iter().any(|l| l == lines::QUIT_MESSAGE),
        "quit message is only for explicit quits"
    );
}

#[tokio::test]
async fn followup_is_folded_into_the_answer() {
    let mut replies = vec![
        Reply::Text(LONG),
        Reply::Text("It taught me to plan smaller changes"),
        // Long again, but right after a follow-up
        Reply::Text(LONG),
    ];
    replies.extend(vec![Reply::Text(SHORT); 4]);
    replies.push(Reply::Quit);

    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(Some(FOLLOWUP)), GateMode::Always),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();
    assert_eq!(report.abort_reason, Some(AbortReason::Quit));

    let asked = h.asked.lock().unwrap().clone();
    assert_eq!(asked[1], "q1_subcategory_followup");
    assert_eq!(asked[2], "q2_main");

    let records = h.sink.records.lock().unwrap();
    assert!(records[0].answer_text.starts_with(LONG));
    assert!(records[0].answer_text.contains(&format!("[Follow-up] {FOLLOWUP}")));
    assert!(records[0].answer_text.ends_with("It taught me to plan smaller changes"));
    assert!(!records[1].answer_text.contains("[Follow-up]"));
}

#[tokio::test]
async fn invalid_followup_is_dropped() {
    let mut replies = vec![Reply::Text(LONG)];
    replies.extend(vec![Reply::Text(SHORT); 5]);
    replies.push(Reply::Quit);

    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(Some("Do you like it?")), GateMode::Always),
        test_config(),
    );

    h.interviewer.run(&profile()).await.unwrap();

    let asked = h.asked.lock().unwrap().clone();
    assert_eq!(asked[1], "q2_main");
    assert!(!asked.iter().any(|id| id.ends_with("_followup")));
}

#[tokio::test]
async fn spoken_answers_steer_the_tier() {
    let mut replies = vec![
        Reply::Spoken(SHORT, loud_tone(4.0)),
        Reply::Spoken(SHORT, silence(4.0)),
        Reply::Text(SHORT),
    ];
    replies.push(Reply::Quit);

    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert_eq!(report.questions[0].tier, WillingnessTier::Medium);
    assert_eq!(report.questions[1].tier, WillingnessTier::High);
    assert_eq!(report.questions[2].tier, WillingnessTier::Low);
    // Typed answers leave the estimate alone
    assert_eq!(report.questions[3].tier, WillingnessTier::Low);
    assert_eq!(report.willingness.tier, WillingnessTier::Low);
}

#[tokio::test]
async fn no_hobbies_goes_straight_to_feedback() {
    let mut replies = professional_answers();
    replies.push(Reply::Text("Not much free time lately"));
    replies.push(Reply::Text("It was fine"));

    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert!(report.completed());
    assert_eq!(report.hobby, None);
    assert_eq!(report.questions.len(), 6);
    assert_eq!(
        h.asked.lock().unwrap().last().map(String::as_str),
        Some("feedback")
    );
    assert!(report.gaps.hobby_gaps.is_empty());
}

#[tokio::test]
async fn generated_hobby_questions_are_used_once_ready() {
    let generator = Arc::new(SlowGenerator::new(Duration::from_millis(50)));
    let calls = Arc::clone(&generator.calls);
    let mut h = harness(
        corpus(Arc::new(MemoryCorpusStore::new()), generator),
        full_script(),
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert!(report.completed());
    assert_eq!(
        report.questions[6].text,
        "What first caught your interest in playing chess?"
    );
    assert!(report.questions[7].text.starts_with("Generated question"));
    assert!(report.questions[8].text.starts_with("Generated question"));
    assert_ne!(report.questions[7].text, report.questions[8].text);
    assert!(
        calls
            .lock()
            .unwrap()
            .contains(&(CategoryType::Hobby, "playing chess".to_string()))
    );
}

#[tokio::test]
async fn slow_generation_falls_back_to_defaults() {
    let generator = Arc::new(SlowGenerator::new(Duration::from_secs(30)));
    let mut config = test_config();
    config.readiness_timeout = Duration::from_millis(50);
    let mut h = harness(
        corpus(Arc::new(MemoryCorpusStore::new()), generator),
        full_script(),
        (FixedModel(None), GateMode::Never),
        config,
    );

    let report = h.interviewer.run(&profile()).await.unwrap();

    assert!(report.completed());
    assert!(
        report.questions[6..]
            .iter()
            .all(|q| !q.text.starts_with("Generated question"))
    );
}

#[tokio::test]
async fn profession_corpus_is_prepared_in_background() {
    let generator = Arc::new(SlowGenerator::new(Duration::ZERO));
    let calls = Arc::clone(&generator.calls);
    let mut config = test_config();
    config.prepare_profession_corpus = true;
    let mut h = harness(
        corpus(Arc::new(MemoryCorpusStore::new()), generator),
        vec![Reply::Quit],
        (FixedModel(None), GateMode::Never),
        config,
    );

    h.interviewer.run(&profile()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let calls = calls.lock().unwrap();
    assert!(calls.contains(&(CategoryType::Main, "Technology".to_string())));
    assert!(calls.contains(&(CategoryType::Subcategory, "Software Engineer".to_string())));
}

#[tokio::test]
async fn intake_collects_a_profile() {
    let replies = vec![
        Reply::Text("My name is Ada"),
        Reply::Text("Software Engineer"),
        Reply::Text("six"),
    ];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let profile = h
        .interviewer
        .intake(&KeywordProfessionClassifier::new(), None)
        .await
        .unwrap()
        .expect("profile");

    assert_eq!(profile.name, "Ada");
    assert_eq!(profile.profession, "software engineer");
    assert_eq!(profile.main_category, "Technology");
    assert_eq!(profile.subcategory, "Senior Software Engineer");
    assert_eq!(profile.years_experience, 6);
    assert_eq!(
        *h.asked.lock().unwrap(),
        vec!["name_prompt", "profession", "experience_1"]
    );
}

#[tokio::test]
async fn intake_skips_a_known_name() {
    let replies = vec![Reply::Text("nurse"), Reply::Text("2")];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let profile = h
        .interviewer
        .intake(&KeywordProfessionClassifier::new(), Some("Grace".to_string()))
        .await
        .unwrap()
        .expect("profile");

    assert_eq!(profile.name, "Grace");
    assert_eq!(profile.years_experience, 2);
    assert!(!h.asked.lock().unwrap().iter().any(|id| id == "name_prompt"));
}

#[tokio::test]
async fn unrecognised_profession_is_kept_as_said() {
    let replies = vec![
        Reply::Text("astronaut"),
        Reply::Text("2"),
        Reply::Text("astronaut"),
        Reply::Text("2"),
        Reply::Text("astronaut"),
        Reply::Text("3"),
    ];
    let mut h = harness(
        offline_corpus(),
        replies,
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let profile = h
        .interviewer
        .intake(&KeywordProfessionClassifier::new(), Some("Grace".to_string()))
        .await
        .unwrap()
        .expect("profile");

    assert_eq!(profile.main_category, "General");
    assert_eq!(profile.subcategory, "Astronaut");
    assert_eq!(profile.years_experience, 3);
    assert!(
        h.lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l == lines::UNKNOWN_PROFESSION)
    );
}

#[tokio::test]
async fn quitting_intake_says_goodbye() {
    let mut h = harness(
        offline_corpus(),
        vec![Reply::Quit],
        (FixedModel(None), GateMode::Never),
        test_config(),
    );

    let profile = h
        .interviewer
        .intake(&KeywordProfessionClassifier::new(), None)
        .await
        .unwrap();

    assert!(profile.is_none());
    assert_eq!(
        h.lines.lock().unwrap().last().map(String::as_str),
        Some(lines::QUIT_MESSAGE)
    );
}
