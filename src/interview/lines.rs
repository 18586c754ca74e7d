//! What the interviewer says between questions

use rand::Rng;
use rand::seq::SliceRandom;

const GREETINGS: [&str; 4] = [
    "Hello, good to see you!",
    "Hi there, wonderful to meet you!",
    "Greetings, it's a pleasure!",
    "Hello, what a delight to meet you!",
];

const INTRODUCTIONS: [&str; 3] = [
    "I'm Cadence, an interviewer built for meaningful conversations.",
    "I'm Cadence, here to have an interesting discussion with you.",
    "My name is Cadence, and I'm here for an engaging conversation.",
];

const NAME_QUESTIONS: [&str; 7] = [
    "What's your name?",
    "May I know your name?",
    "What should I call you?",
    "What name do you go by?",
    "Mind sharing your name?",
    "Who do I have the pleasure of speaking with?",
    "Can you tell me your name?",
];

const WELCOMES: [&str; 3] = [
    "Welcome {name}, it's an absolute pleasure to have you here.",
    "Welcome {name}, I'm truly excited to have you with us today.",
    "Welcome {name}, it's wonderful to have you here.",
];

const OPENERS: [&str; 3] = [
    "I'm looking forward to delving into your thoughts on both your career and your interests. Let's start our conversation.",
    "I can't wait to explore your professional insights and personal passions. Let's start our conversation.",
    "I'm eager to learn about your work experiences and the things that interest you beyond your profession. Let's start our conversation.",
];

const PROFESSION_QUESTIONS: [&str; 5] = [
    "{name}, what is your profession?",
    "{name}, what do you do professionally?",
    "{name}, what's your current profession?",
    "{name}, what is your official job title?",
    "{name}, what is your current occupation?",
];

const EXPERIENCE_QUESTIONS: [&str; 6] = [
    "{name}, how many years of experience do you have?",
    "How long have you been in this field, {name}?",
    "What's your total work experience, {name}?",
    "Can you share how many years you've been working, {name}?",
    "{name}, how experienced are you in your profession?",
    "How long have you been doing this work, {name}?",
];

const HOBBY_DISCOVERY_QUESTIONS: [&str; 7] = [
    "What are some of your hobbies or activities you enjoy, {name}?",
    "Tell me about your interests outside of work, {name}. What do you enjoy doing?",
    "{name}, what activities do you find most fulfilling in your free time?",
    "I'd love to know about your hobbies, {name}. What do you like to do?",
    "What are some activities or interests that you're passionate about, {name}?",
    "{name}, how do you like to spend your leisure time?",
    "Outside of your professional life, what kinds of activities interest you, {name}?",
];

const FEEDBACK_QUESTIONS: [&str; 2] = [
    "Before we conclude, {name}, what's one piece of advice you'd give to young people?",
    "One last question. If you could plant one piece of wisdom in the minds of young people today, what would it be?",
];

/// Name used when none could be made out
pub const DEFAULT_NAME: &str = "Friend";

pub const NAME_REPROMPT: &str = "I didn't catch your name. Could you please tell me your name?";
pub const PROFESSION_REPROMPT: &str = "Could you tell me about your profession?";
pub const UNKNOWN_PROFESSION: &str = "I'm not familiar with that profession. Please specify a recognized profession using common industry terms.";
pub const EXPERIENCE_REPROMPT: &str = "Please say a number for your years of experience.";
pub const NEGATIVE_EXPERIENCE: &str = "Experience cannot be negative. Please enter a valid number.";
pub const INSTRUCTIONS: &str = "I'll ask you questions to learn more about you. I'd love to hear your thoughts in as much detail, or as little, as you'd like.";
pub const HOBBY_TRANSITION: &str = "Now I'd like to learn about your interests.";
pub const QUIT_MESSAGE: &str = "Thank you for sharing! Interview ended at your request.";

fn pick<R: Rng>(rng: &mut R, lines: &[&str], name: &str) -> String {
    lines
        .choose(rng)
        .copied()
        .unwrap_or_default()
        .replace("{name}", name)
}

pub fn greeting<R: Rng>(rng: &mut R) -> String {
    pick(rng, &GREETINGS, "")
}

pub fn introduction<R: Rng>(rng: &mut R) -> String {
    pick(rng, &INTRODUCTIONS, "")
}

pub fn name_question<R: Rng>(rng: &mut R) -> String {
    pick(rng, &NAME_QUESTIONS, "")
}

pub fn welcome<R: Rng>(rng: &mut R, name: &str) -> String {
    pick(rng, &WELCOMES, name)
}

pub fn opener<R: Rng>(rng: &mut R) -> String {
    pick(rng, &OPENERS, "")
}

pub fn profession_question<R: Rng>(rng: &mut R, name: &str) -> String {
    pick(rng, &PROFESSION_QUESTIONS, name)
}

pub fn experience_question<R: Rng>(rng: &mut R, name: &str) -> String {
    pick(rng, &EXPERIENCE_QUESTIONS, name)
}

pub fn hobby_discovery_question<R: Rng>(rng: &mut R, name: &str) -> String {
    pick(rng, &HOBBY_DISCOVERY_QUESTIONS, name)
}

pub fn feedback_question<R: Rng>(rng: &mut R, name: &str) -> String {
    pick(rng, &FEEDBACK_QUESTIONS, name)
}

#[must_use]
pub fn begin(name: &str) -> String {
    format!("Great, {name}! Let's begin our conversation about your personality and experiences.")
}

/// Announces which hobby the deep dive will cover
#[must_use]
pub fn hobby_intro(hobbies: &[String], selected: &str) -> String {
    format!(
        "I hear that you enjoy {}. I'll focus on your interest in {selected}.",
        hobbies.join(", ")
    )
}

#[must_use]
pub fn closing(name: &str) -> String {
    format!("Thank you for giving your valuable time, {name}. I truly appreciate it.")
}
