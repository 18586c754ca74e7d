//! Keyword heuristics over transcripts
//!
//! Hobbies, professions, names and numbers pulled out of free text with
//! fixed word lists. Good enough for spoken answers; no NLP models.

use std::sync::LazyLock;

use regex::Regex;

use crate::ports::{HobbyExtractor, ProfessionCategories, ProfessionClassifier};

/// Words after which a hobby phrase usually follows
const HOBBY_INDICATORS: [&str; 8] = [
    "enjoy", "like", "love", "passion", "hobby", "interest", "into", "fan of",
];

/// Verbs that only make a hobby together with an object ("playing chess")
const OBJECT_VERBS: [&str; 4] = ["play", "playing", "watch", "watching"];

const STANDALONE_HOBBIES: [&str; 19] = [
    "dancing",
    "singing",
    "painting",
    "drawing",
    "reading",
    "writing",
    "cooking",
    "baking",
    "hiking",
    "swimming",
    "running",
    "cycling",
    "gaming",
    "gardening",
    "programming",
    "coding",
    "photography",
    "traveling",
    "collecting",
];

const HOBBY_PHRASES: [&str; 16] = [
    "watching tv",
    "watching movies",
    "playing games",
    "playing video games",
    "playing music",
    "listening to music",
    "working out",
    "martial arts",
    "playing chess",
    "playing guitar",
    "playing piano",
    "watching sports",
    "playing football",
    "playing cricket",
    "watching football",
    "watching cricket",
];

/// Words that end a hobby phrase
const PHRASE_BREAKS: [&str; 12] = [
    "and", "or", "but", "because", "so", "when", "with", "on", "at", "in", "after", "also",
];

/// Filler that is never a hobby on its own
const FILLER: [&str; 16] = [
    "to", "the", "a", "an", "my", "it", "that", "this", "doing", "do", "really", "very", "much",
    "lot", "things", "stuff",
];

/// Longest phrase taken after an indicator, in words
const MAX_PHRASE_WORDS: usize = 5;

/// Finds hobby phrases by indicator words, known hobbies and known phrases
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordHobbyExtractor;

impl KeywordHobbyExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn push_unique(found: &mut Vec<String>, hobby: String) {
    if !hobby.is_empty() && !found.contains(&hobby) {
        found.push(hobby);
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|w| !w.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Split into clauses at punctuation so phrases never cross a sentence
fn clauses(text: &str) -> Vec<Vec<String>> {
    text.split(['.', ',', ';', '!', '?'])
        .map(tokenize)
        .filter(|c| !c.is_empty())
        .collect()
}

impl HobbyExtractor for KeywordHobbyExtractor {
    fn extract(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        let lower = text.to_lowercase();

        // Known multi-word phrases, in order of appearance
        let mut phrases: Vec<(usize, &str)> = HOBBY_PHRASES
            .iter()
            .filter_map(|p| lower.find(p).map(|at| (at, *p)))
            .collect();
        phrases.sort_unstable();
        // Prefer the longest phrase at a position ("playing video games" over "playing games")
        for (_, phrase) in &phrases {
            if !found.iter().any(|f: &String| f.contains(phrase) || phrase.contains(f.as_str())) {
                push_unique(&mut found, (*phrase).to_string());
            }
        }

        for clause in clauses(text) {
            for (i, word) in clause.iter().enumerate() {
                let indicator = HOBBY_INDICATORS.contains(&word.as_str())
                    || (word == "fan" && clause.get(i + 1).is_some_and(|w| w == "of"));
                if !indicator {
                    continue;
                }

                let start = if word == "fan" { i + 2 } else { i + 1 };
                let words: Vec<&str> = clause
                    .iter()
                    .skip(start)
                    .take(MAX_PHRASE_WORDS)
                    .map(String::as_str)
                    .take_while(|w| !PHRASE_BREAKS.contains(w))
                    .skip_while(|w| FILLER.contains(w))
                    .collect();

                match words.as_slice() {
                    [] => {}
                    [only] if OBJECT_VERBS.contains(only) || FILLER.contains(only) => {}
                    _ => {
                        let phrase = words.join(" ");
                        if !found.iter().any(|f| phrase.contains(f.as_str())) {
                            push_unique(&mut found, phrase);
                        }
                    }
                }
            }

            for word in &clause {
                if STANDALONE_HOBBIES.contains(&word.as_str())
                    && !found.iter().any(|f| f.contains(word.as_str()))
                {
                    push_unique(&mut found, word.clone());
                }
            }
        }

        found
    }
}

/// One industry the classifier knows about
struct Industry {
    name: &'static str,
    /// Full job titles, strongest signal
    specific_roles: &'static [&'static str],
    core_roles: &'static [&'static str],
    fields: &'static [&'static str],
}

const INDUSTRIES: [Industry; 8] = [
    Industry {
        name: "Technology",
        specific_roles: &[
            "software engineer",
            "data scientist",
            "web developer",
            "system administrator",
            "network engineer",
            "security analyst",
            "cloud architect",
            "devops engineer",
            "product manager",
            "database administrator",
            "machine learning engineer",
            "data engineer",
            "data analyst",
            "mechanical engineer",
            "civil engineer",
        ],
        core_roles: &["developer", "engineer", "programmer", "architect", "technician"],
        fields: &[
            "software",
            "hardware",
            "data",
            "network",
            "cloud",
            "web",
            "mobile",
            "security",
            "machine learning",
            "artificial intelligence",
            "ai",
            "tech",
            "engineering",
            "computer",
        ],
    },
    Industry {
        name: "Education",
        specific_roles: &[
            "assistant professor",
            "associate professor",
            "head of department",
            "academic advisor",
            "principal",
        ],
        core_roles: &[
            "professor",
            "teacher",
            "lecturer",
            "instructor",
            "educator",
            "tutor",
            "dean",
        ],
        fields: &[
            "education",
            "teaching",
            "school",
            "university",
            "college",
            "classroom",
            "curriculum",
        ],
    },
    Industry {
        name: "Healthcare",
        specific_roles: &[
            "registered nurse",
            "physical therapist",
            "cardiologist",
            "pediatrician",
            "psychiatrist",
            "pharmacist",
            "dentist",
            "surgeon",
        ],
        core_roles: &["doctor", "physician", "nurse", "therapist", "clinician", "paramedic"],
        fields: &["health", "medicine", "medical", "clinical", "hospital", "clinic", "nursing"],
    },
    Industry {
        name: "Business",
        specific_roles: &[
            "marketing manager",
            "financial analyst",
            "operations manager",
            "project manager",
            "sales representative",
            "account executive",
            "business consultant",
        ],
        core_roles: &["manager", "executive", "director", "consultant", "accountant", "entrepreneur"],
        fields: &[
            "business",
            "management",
            "marketing",
            "sales",
            "finance",
            "accounting",
            "operations",
            "consulting",
        ],
    },
    Industry {
        name: "Legal",
        specific_roles: &["corporate lawyer", "patent attorney", "general counsel", "public defender"],
        core_roles: &["lawyer", "attorney", "judge", "paralegal", "solicitor", "barrister"],
        fields: &["law", "legal", "court", "litigation", "compliance"],
    },
    Industry {
        name: "Creative",
        specific_roles: &[
            "graphic designer",
            "art director",
            "creative director",
            "fashion designer",
            "interior designer",
            "content writer",
        ],
        core_roles: &["designer", "artist", "writer", "photographer", "musician", "animator", "editor"],
        fields: &["design", "art", "media", "film", "music", "photography", "publishing"],
    },
    Industry {
        name: "Science",
        specific_roles: &["research scientist", "lab technician"],
        core_roles: &["scientist", "researcher", "chemist", "biologist", "physicist"],
        fields: &["research", "laboratory", "biology", "chemistry", "physics"],
    },
    Industry {
        name: "Trades",
        specific_roles: &["construction worker", "truck driver"],
        core_roles: &["electrician", "plumber", "carpenter", "mechanic", "chef", "cook", "farmer"],
        fields: &["construction", "restaurant", "kitchen", "agriculture", "manufacturing"],
    },
];

const SPECIFIC_ROLE_WEIGHT: u32 = 5;
const CORE_ROLE_WEIGHT: u32 = 3;
const FIELD_WEIGHT: u32 = 2;

/// Seniority prefix from years of experience
fn seniority(years: Option<u32>) -> Option<&'static str> {
    match years? {
        0..2 => Some("Junior"),
        2..5 => None,
        5..10 => Some("Senior"),
        _ => Some("Executive"),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

pub(crate) fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn weighted(count: usize, weight: u32) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(weight)
}

fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let target: Vec<&str> = phrase.split_whitespace().collect();
    words
        .windows(target.len())
        .any(|window| window.iter().map(String::as_str).eq(target.iter().copied()))
}

/// Scores a profession against fixed industry word lists
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordProfessionClassifier;

impl KeywordProfessionClassifier {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProfessionClassifier for KeywordProfessionClassifier {
    fn classify(&self, text: &str, years_experience: Option<u32>) -> Option<ProfessionCategories> {
        let words = tokenize(text);
        if words.is_empty() {
            return None;
        }
        // Plural roles ("engineers") still count
        let singular: Vec<String> = words
            .iter()
            .map(|w| {
                w.strip_suffix('s')
                    .filter(|s| s.len() > 3)
                    .unwrap_or(w.as_str())
                    .to_string()
            })
            .collect();
        let matches =
            |phrase: &str| contains_phrase(&words, phrase) || contains_phrase(&singular, phrase);

        let mut best: Option<(u32, &Industry, Option<&str>)> = None;
        for industry in &INDUSTRIES {
            let specific = industry.specific_roles.iter().copied().find(|&r| matches(r));
            let core: Vec<&str> = industry
                .core_roles
                .iter()
                .copied()
                .filter(|&r| matches(r))
                .collect();
            let fields = industry.fields.iter().filter(|&&f| matches(f)).count();

            let score = specific.map_or(0, |_| SPECIFIC_ROLE_WEIGHT)
                + weighted(core.len(), CORE_ROLE_WEIGHT)
                + weighted(fields, FIELD_WEIGHT);

            if score > best.map_or(0, |(s, _, _)| s) {
                best = Some((score, industry, specific.or_else(|| core.first().copied())));
            }
        }

        let (score, industry, role) = best?;
        let title = title_case(role.unwrap_or(text.trim()));
        let subcategory = match seniority(years_experience) {
            Some(level) => format!("{level} {title}"),
            None => title,
        };

        tracing::debug!(
            profession = text,
            main_category = industry.name,
            subcategory = %subcategory,
            score,
            "classified profession"
        );

        Some(ProfessionCategories {
            main_category: industry.name.to_string(),
            subcategory,
        })
    }
}

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+(?:\.\d+)?)").expect("valid regex"));

const NUMBER_WORDS: [(&str, f64); 25] = [
    ("zero", 0.0),
    ("one", 1.0),
    ("two", 2.0),
    ("three", 3.0),
    ("four", 4.0),
    ("five", 5.0),
    ("six", 6.0),
    ("seven", 7.0),
    ("eight", 8.0),
    ("nine", 9.0),
    ("ten", 10.0),
    ("eleven", 11.0),
    ("twelve", 12.0),
    ("thirteen", 13.0),
    ("fourteen", 14.0),
    ("fifteen", 15.0),
    ("sixteen", 16.0),
    ("seventeen", 17.0),
    ("eighteen", 18.0),
    ("nineteen", 19.0),
    ("twenty", 20.0),
    ("thirty", 30.0),
    ("forty", 40.0),
    ("fifty", 50.0),
    ("half", 0.5),
];

/// First number in `text`, as digits or as a number word
///
/// Compound words add up ("twenty five" is 25).
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    if let Some(m) = DIGITS.captures(text).and_then(|c| c.get(1)) {
        return m.as_str().parse().ok();
    }

    let words = tokenize(text);
    let mut total = None;
    for word in &words {
        match NUMBER_WORDS.iter().find(|(w, _)| *w == word.as_str()) {
            Some((_, value)) => *total.get_or_insert(0.0) += value,
            None if total.is_some() => break,
            None => {}
        }
    }
    total
}

const TITLES: [(&str, &str); 14] = [
    ("dr", "Doctor"),
    ("doctor", "Doctor"),
    ("mr", "Mister"),
    ("mister", "Mister"),
    ("mrs", "Missus"),
    ("miss", "Miss"),
    ("ms", "Miss"),
    ("prof", "Professor"),
    ("professor", "Professor"),
    ("sir", "Sir"),
    ("madam", "Madam"),
    ("rev", "Reverend"),
    ("reverend", "Reverend"),
    ("captain", "Captain"),
];

const INTRO_PATTERNS: [&str; 7] = [
    "my name is",
    "i am",
    "i'm",
    "this is",
    "call me",
    "myself",
    "name's",
];

/// Words that follow "i am" without being a name
const NOT_NAMES: [&str; 10] = [
    "a", "an", "the", "here", "fine", "good", "ok", "okay", "not", "just",
];

/// Speaker's name from an introduction, if one can be found
#[must_use]
pub fn extract_name(text: &str) -> Option<String> {
    let words = tokenize(&text.replace('.', " "));
    if words.is_empty() {
        return None;
    }

    let start = INTRO_PATTERNS
        .iter()
        .filter_map(|pattern| {
            let target: Vec<&str> = pattern.split_whitespace().collect();
            words
                .windows(target.len())
                .position(|w| w.iter().map(String::as_str).eq(target.iter().copied()))
                .map(|at| at + target.len())
        })
        .min()
        // A bare answer ("Priya") is the name itself
        .or_else(|| (words.len() <= 3).then_some(0))?;

    let mut rest = words[start..].iter().map(String::as_str);
    let first = rest.next()?;

    let (title, first) = match TITLES.iter().find(|(t, _)| *t == first) {
        Some((_, expanded)) => (Some(*expanded), rest.next()),
        None => (None, Some(first)),
    };

    let name = first.filter(|w| !NOT_NAMES.contains(w)).map(capitalize);

    match (title, name) {
        (Some(title), Some(name)) => Some(format!("{title} {name}")),
        (Some(title), None) => Some(title.to_string()),
        (None, name) => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hobbies_from_indicators_and_phrases() {
        let hobbies = KeywordHobbyExtractor::new()
            .extract("I really enjoy rock climbing, and on weekends I love playing chess.");
        assert_eq!(hobbies, vec!["playing chess".to_string(), "rock climbing".to_string()]);
    }

    #[test]
    fn standalone_hobbies_are_found() {
        let hobbies = KeywordHobbyExtractor::new().extract("Mostly gardening. Some baking too.");
        assert_eq!(hobbies, vec!["gardening".to_string(), "baking".to_string()]);
    }

    #[test]
    fn bare_object_verbs_are_not_hobbies() {
        let hobbies = KeywordHobbyExtractor::new().extract("I like watching.");
        assert!(hobbies.is_empty());
    }

    #[test]
    fn no_hobbies_in_unrelated_text() {
        assert!(KeywordHobbyExtractor::new().extract("Not much free time lately.").is_empty());
    }

    #[test]
    fn profession_classified_by_specific_role() {
        let categories = KeywordProfessionClassifier::new()
            .classify("software engineer", Some(6))
            .unwrap();
        assert_eq!(categories.main_category, "Technology");
        assert_eq!(categories.subcategory, "Senior Software Engineer");
    }

    #[test]
    fn profession_classified_by_core_role() {
        let categories = KeywordProfessionClassifier::new()
            .classify("I teach at a school, I'm a teacher", Some(3))
            .unwrap();
        assert_eq!(categories.main_category, "Education");
    }

    #[test]
    fn unknown_profession_is_none() {
        assert!(KeywordProfessionClassifier::new().classify("astronaut", None).is_none());
        assert!(KeywordProfessionClassifier::new().classify("   ", None).is_none());
    }

    #[test]
    fn numbers_from_digits_and_words() {
        assert_eq!(parse_number("about 12 years"), Some(12.0));
        assert_eq!(parse_number("twenty five years"), Some(25.0));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("a while"), None);
    }

    #[test]
    fn names_from_introductions() {
        assert_eq!(extract_name("Hi, my name is priya."), Some("Priya".to_string()));
        assert_eq!(extract_name("I'm Dr. Okafor"), Some("Doctor Okafor".to_string()));
        assert_eq!(extract_name("Sam"), Some("Sam".to_string()));
        assert_eq!(extract_name("I am not sure what you mean by that"), None);
    }
}
