//! Built-in question templates used until a generated dataset exists

use super::{CategoryType, QuestionTemplate, partition_by_tier};

/// Asked when no category name is known at all
pub const FALLBACK_QUESTION: &str = "Could you tell me more about your interests and experiences?";

const MAIN: [&str; 25] = [
    "How has {category} changed your daily routine?",
    "What excites you most about {category} today?",
    "Do you see {category} differently than five years ago?",
    "What's the biggest challenge in {category} now?",
    "Has {category} met your expectations so far?",
    "Where do you see {category} heading next?",
    "Is there something about {category} people misunderstand?",
    "How has {category} impacted your career path?",
    "What {category} trend seems overrated to you?",
    "Do you think {category} is accessible to everyone?",
    "What {category} skill seems most valuable today?",
    "Has {category} changed how you solve problems?",
    "What would improve {category} for beginners?",
    "Do ethics in {category} get enough attention?",
    "What's your favorite aspect of {category}?",
    "Has {category} connected you with interesting people?",
    "What's one {category} myth you'd like to debunk?",
    "How do you stay current with {category}?",
    "What {category} resource would you recommend?",
    "Has {category} become more complex over time?",
    "Do you think {category} is changing society positively?",
    "What {category} development are you watching closely?",
    "Is {category} headed in the right direction?",
    "What drew you to {category} initially?",
    "How might {category} evolve in five years?",
];

const SUBCATEGORY: [&str; 25] = [
    "What's the best part of working in {category}?",
    "Has your perspective on {category} changed over time?",
    "What skill in {category} took longest to develop?",
    "Do people misunderstand what {category} professionals actually do?",
    "What {category} challenge do you face regularly?",
    "Has technology changed how you approach {category}?",
    "What attracted you to {category} initially?",
    "Is work-life balance possible in {category}?",
    "What {category} task do you find most rewarding?",
    "Has {category} become more competitive recently?",
    "What's something about {category} that surprised you?",
    "Do you think {category} gets proper recognition?",
    "What tool or method revolutionized your {category} work?",
    "How do you explain {category} to someone unfamiliar?",
    "What's changing fastest in {category} right now?",
    "Do you mentor others in {category}?",
    "What {category} skill is undervalued today?",
    "Has your definition of success in {category} evolved?",
    "What keeps you motivated in {category}?",
    "Do you collaborate with others in {category}?",
    "What would you change about {category} education?",
    "Has specializing in {category} been worth it?",
    "What's one {category} mistake people often make?",
    "How do you handle stress in {category}?",
    "What makes someone truly excel in {category}?",
];

const HOBBY: [&str; 25] = [
    "What first caught your interest in {category}?",
    "What still amazes you about {category}?",
    "Has {category} changed how you see things?",
    "What's your personal style with {category}?",
    "What {category} challenge changed you most?",
    "What has {category} revealed about yourself?",
    "What {category} experience would you share?",
    "Has your approach to {category} evolved?",
    "What {category} question still intrigues you?",
    "Who has {category} connected you with?",
    "Any personal rituals around your {category}?",
    "Does your mood affect your {category} practice?",
    "What's something hard about {category} for you?",
    "Has {category} affected your relationships?",
    "What aspect of {category} challenges you most?",
    "How has {category} influenced your space?",
    "What's your guiding principle with {category}?",
    "Has {category} been healing for you?",
    "What {category} myth have you disproven?",
    "Has your background influenced your {category}?",
    "Do you set limits around {category}?",
    "Does perfectionism affect your {category}?",
    "How would you map your {category} journey?",
    "What values has {category} reinforced?",
    "What's your most treasured {category} memory?",
];

const fn templates_for(category_type: CategoryType) -> &'static [&'static str; 25] {
    match category_type {
        CategoryType::Subcategory => &SUBCATEGORY,
        CategoryType::Hobby => &HOBBY,
        CategoryType::Main | CategoryType::Feedback | CategoryType::General => &MAIN,
    }
}

/// All default questions for a category, formatted and tiered
#[must_use]
pub fn default_questions(category_type: CategoryType, category_name: &str) -> Vec<QuestionTemplate> {
    let texts = templates_for(category_type)
        .iter()
        .map(|t| t.replace("{category}", category_name))
        .collect();
    partition_by_tier(texts, category_type, category_name)
}
