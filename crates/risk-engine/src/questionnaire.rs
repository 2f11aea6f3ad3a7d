//! Question bank, answers, and response sets

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::RiskError;

/// Questions drawn per assessment round
pub const ROUND_SIZE: usize = 10;

/// Well-being area a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Stress,
    Mood,
    Emotional,
    Sleep,
    Anxiety,
    Social,
    Satisfaction,
    Hope,
    Fulfillment,
    Physical,
    Health,
    Coping,
    Outlook,
    Focus,
    Balance,
    #[serde(rename = "self")]
    SelfImage,
    Relationships,
    Anger,
    Purpose,
    Growth,
}

impl Category {
    pub const ALL: [Category; 20] = [
        Category::Stress,
        Category::Mood,
        Category::Emotional,
        Category::Sleep,
        Category::Anxiety,
        Category::Social,
        Category::Satisfaction,
        Category::Hope,
        Category::Fulfillment,
        Category::Physical,
        Category::Health,
        Category::Coping,
        Category::Outlook,
        Category::Focus,
        Category::Balance,
        Category::SelfImage,
        Category::Relationships,
        Category::Anger,
        Category::Purpose,
        Category::Growth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stress => "stress",
            Category::Mood => "mood",
            Category::Emotional => "emotional",
            Category::Sleep => "sleep",
            Category::Anxiety => "anxiety",
            Category::Social => "social",
            Category::Satisfaction => "satisfaction",
            Category::Hope => "hope",
            Category::Fulfillment => "fulfillment",
            Category::Physical => "physical",
            Category::Health => "health",
            Category::Coping => "coping",
            Category::Outlook => "outlook",
            Category::Focus => "focus",
            Category::Balance => "balance",
            Category::SelfImage => "self",
            Category::Relationships => "relationships",
            Category::Anger => "anger",
            Category::Purpose => "purpose",
            Category::Growth => "growth",
        }
    }

    /// Suggestion attached when the category does not score as strong
    pub fn focus_tip(&self) -> &'static str {
        match self {
            Category::Stress => "Schedule short breaks through the day",
            Category::Mood => "Note one thing each day that lifted your mood",
            Category::Emotional => "Name your feelings as they come up",
            Category::Sleep => "Keep a regular sleep schedule",
            Category::Anxiety => "Practice slow breathing when worry builds",
            Category::Social => "Reach out to someone you trust this week",
            Category::Satisfaction => "List recent things that went well",
            Category::Hope => "Set one small goal you can reach soon",
            Category::Fulfillment => "Make time for an activity that feels meaningful",
            Category::Physical => "Add a short walk to your day",
            Category::Health => "Keep regular meals and stay hydrated",
            Category::Coping => "Try one new healthy coping strategy",
            Category::Outlook => "Break long-term goals into small steps",
            Category::Focus => "Work in short focused blocks",
            Category::Balance => "Protect time away from work or studies",
            Category::SelfImage => "Speak to yourself as you would to a friend",
            Category::Relationships => "Share how you feel with someone close",
            Category::Anger => "Pause before responding when frustrated",
            Category::Purpose => "Reflect on what matters most to you",
            Category::Growth => "Treat setbacks as something to learn from",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| RiskError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: Category,
}

/// Likert answer, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Answer(u8);

impl Answer {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, RiskError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(RiskError::InvalidAnswer(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Answer scale label shown next to the value
    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "Never/Poor",
            2 => "Rarely/Below Average",
            3 => "Sometimes/Fair",
            4 => "Often/Good",
            _ => "Always/Excellent",
        }
    }
}

impl TryFrom<i64> for Answer {
    type Error = RiskError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Answer::new(value)
    }
}

impl From<Answer> for u8 {
    fn from(answer: Answer) -> Self {
        answer.0
    }
}

/// Question id to answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseSet(BTreeMap<String, Answer>);

impl ResponseSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer, replacing any earlier one for the same question
    pub fn answer(&mut self, question_id: impl Into<String>, answer: Answer) {
        self.0.insert(question_id.into(), answer);
    }

    pub fn get(&self, question_id: &str) -> Option<Answer> {
        self.0.get(question_id).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Answer)> + '_ {
        self.0.iter().map(|(id, a)| (id.as_str(), *a))
    }

    /// Raw values keyed by question id
    pub fn to_values(&self) -> BTreeMap<String, u8> {
        self.0.iter().map(|(id, a)| (id.clone(), a.value())).collect()
    }
}

impl<S: Into<String>> FromIterator<(S, Answer)> for ResponseSet {
    fn from_iter<T: IntoIterator<Item = (S, Answer)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(id, a)| (id.into(), a)).collect())
    }
}

/// Pool of questions a round is drawn from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The built-in 90-question bank
    pub fn standard() -> Self {
        let questions = STANDARD_QUESTIONS
            .iter()
            .enumerate()
            .map(|(i, (text, category))| Question {
                id: format!("q{}", i + 1),
                text: (*text).to_string(),
                category: *category,
            })
            .collect();
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Question> + '_ {
        self.questions.iter().filter(move |q| q.category == category)
    }

    /// Draw `n` distinct questions at random (fewer if the bank is smaller)
    pub fn draw<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Question> {
        self.questions.choose_multiple(rng, n).cloned().collect()
    }

    /// Resolve question ids into the active subset
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Question>, RiskError> {
        ids.iter()
            .map(|id| {
                self.get(id.as_ref())
                    .cloned()
                    .ok_or_else(|| RiskError::UnknownQuestion(id.as_ref().to_string()))
            })
            .collect()
    }
}

const STANDARD_QUESTIONS: [(&str, Category); 90] = [
    ("How often do you feel overwhelmed by daily tasks?", Category::Stress),
    ("How would you rate your ability to handle stress?", Category::Stress),
    ("How frequently do you experience sudden mood changes?", Category::Mood),
    ("How often do you feel satisfied with your emotional state?", Category::Emotional),
    ("How well can you identify and express your feelings?", Category::Emotional),
    ("How would you rate your sleep quality?", Category::Sleep),
    ("How often do you wake up feeling refreshed?", Category::Sleep),
    ("How frequently do you have trouble falling asleep?", Category::Sleep),
    ("How often do you experience disrupted sleep?", Category::Sleep),
    ("Do you maintain a regular sleep schedule?", Category::Sleep),
    ("How often do you feel anxious or worried?", Category::Anxiety),
    ("How frequently do you experience racing thoughts?", Category::Anxiety),
    ("How often do you feel restless or on edge?", Category::Anxiety),
    ("Do you experience physical symptoms of anxiety?", Category::Anxiety),
    ("How well can you control worried thoughts?", Category::Anxiety),
    ("How connected do you feel to friends and family?", Category::Social),
    ("How satisfied are you with your social relationships?", Category::Social),
    ("How often do you feel lonely?", Category::Social),
    ("How comfortable are you in social situations?", Category::Social),
    ("How often do you engage in social activities?", Category::Social),
    ("How satisfied are you with your current life situation?", Category::Satisfaction),
    ("How often do you feel hopeful about the future?", Category::Hope),
    ("How meaningful do you find your daily activities?", Category::Fulfillment),
    ("How satisfied are you with your achievements?", Category::Satisfaction),
    ("How often do you feel a sense of purpose?", Category::Fulfillment),
    ("How often do you engage in physical activity?", Category::Physical),
    ("How would you rate your overall physical health?", Category::Health),
    ("How satisfied are you with your energy levels?", Category::Physical),
    ("How well do you maintain a healthy diet?", Category::Health),
    ("How often do you experience physical discomfort?", Category::Health),
    ("How well do you handle stress in daily life?", Category::Coping),
    ("How effectively do you solve problems?", Category::Coping),
    ("How often do you use healthy coping strategies?", Category::Coping),
    ("How well do you adapt to change?", Category::Coping),
    ("How resilient do you feel when facing challenges?", Category::Coping),
    ("How often do you feel sad or down?", Category::Mood),
    ("How often do you experience loss of interest?", Category::Mood),
    ("How would you rate your overall mood?", Category::Mood),
    ("How often do you feel worthless?", Category::Mood),
    ("How frequently do you experience joy?", Category::Mood),
    ("How confident do you feel about your future?", Category::Outlook),
    ("How optimistic are you about achieving your goals?", Category::Outlook),
    ("How clear is your vision for the future?", Category::Outlook),
    ("How much control do you feel over your life?", Category::Outlook),
    ("How motivated are you to pursue your goals?", Category::Outlook),
    ("How often do you have trouble concentrating?", Category::Focus),
    ("How would you rate your memory?", Category::Focus),
    ("How well can you focus on tasks?", Category::Focus),
    ("How often do you feel mentally sharp?", Category::Focus),
    ("How easily can you make decisions?", Category::Focus),
    ("How comfortable are you expressing emotions?", Category::Emotional),
    ("How well do you understand your feelings?", Category::Emotional),
    ("How often do you share feelings with others?", Category::Emotional),
    ("How well do you regulate your emotions?", Category::Emotional),
    ("How often do you feel emotionally balanced?", Category::Emotional),
    ("How satisfied are you with work/studies?", Category::Fulfillment),
    ("How well do you manage work-life balance?", Category::Balance),
    ("How often do you feel productive?", Category::Fulfillment),
    ("How stressed are you about work/studies?", Category::Stress),
    ("How motivated are you in your work/studies?", Category::Fulfillment),
    ("How satisfied are you with yourself?", Category::SelfImage),
    ("How confident do you feel in general?", Category::SelfImage),
    ("How accepting are you of your flaws?", Category::SelfImage),
    ("How often do you practice self-care?", Category::SelfImage),
    ("How kind are you to yourself?", Category::SelfImage),
    ("How satisfied are you with your relationships?", Category::Relationships),
    ("How supported do you feel by others?", Category::Relationships),
    ("How well do you communicate in relationships?", Category::Relationships),
    ("How often do you feel understood by others?", Category::Relationships),
    ("How well do you maintain boundaries?", Category::Relationships),
    ("How well do you control your anger?", Category::Anger),
    ("How often do you feel irritable?", Category::Anger),
    ("How well do you express anger appropriately?", Category::Anger),
    ("How often do you feel frustrated?", Category::Anger),
    ("How well do you resolve conflicts?", Category::Anger),
    ("How meaningful do you find your life?", Category::Purpose),
    ("How aligned are you with your values?", Category::Purpose),
    ("How often do you feel fulfilled?", Category::Purpose),
    ("How clear are your life goals?", Category::Purpose),
    ("How often do you feel you make a difference?", Category::Purpose),
    ("How well do you manage daily stress?", Category::Stress),
    ("How often do you take breaks when needed?", Category::Stress),
    ("How well do you balance responsibilities?", Category::Stress),
    ("How often do you feel relaxed?", Category::Stress),
    ("How well do you prioritize tasks?", Category::Stress),
    ("How open are you to learning from mistakes?", Category::Growth),
    ("How well do you handle criticism?", Category::Growth),
    ("How often do you try new things?", Category::Growth),
    ("How resilient are you after setbacks?", Category::Growth),
    ("How committed are you to personal growth?", Category::Growth),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_standard_bank_covers_every_category() {
        let bank = QuestionBank::standard();
        assert_eq!(bank.len(), 90);
        for category in Category::ALL {
            assert!(bank.in_category(category).count() > 0, "{}", category);
        }
        assert_eq!(bank.get("q6").unwrap().category, Category::Sleep);
        assert_eq!(bank.get("q90").unwrap().category, Category::Growth);
    }

    #[test]
    fn test_draw_distinct() {
        let bank = QuestionBank::standard();
        let mut rng = StdRng::seed_from_u64(7);
        let round = bank.draw(ROUND_SIZE, &mut rng);
        assert_eq!(round.len(), ROUND_SIZE);
        let ids: HashSet<_> = round.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids.len(), ROUND_SIZE);
    }

    #[test]
    fn test_select_unknown_question() {
        let bank = QuestionBank::standard();
        assert_eq!(
            bank.select(&["q1", "q91"]),
            Err(RiskError::UnknownQuestion("q91".into()))
        );
        assert_eq!(bank.select(&["q1", "q2"]).unwrap().len(), 2);
    }

    #[test]
    fn test_answer_range() {
        assert!(Answer::new(1).is_ok());
        assert!(Answer::new(5).is_ok());
        assert_eq!(Answer::new(0), Err(RiskError::InvalidAnswer(0)));
        assert_eq!(Answer::new(6), Err(RiskError::InvalidAnswer(6)));
        assert_eq!(Answer::new(3).unwrap().label(), "Sometimes/Fair");
    }

    #[test]
    fn test_response_set_json() {
        let responses: ResponseSet = serde_json::from_str(r#"{"q1": 4, "q6": 2}"#).unwrap();
        assert_eq!(responses.get("q1").map(|a| a.value()), Some(4));
        assert_eq!(responses.len(), 2);

        let rejected: Result<ResponseSet, _> = serde_json::from_str(r#"{"q1": 9}"#);
        assert!(rejected.is_err());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(serde_json::to_string(&Category::SelfImage).unwrap(), "\"self\"");
        assert_eq!("self".parse::<Category>().unwrap(), Category::SelfImage);
        assert!("wellbeing".parse::<Category>().is_err());
    }
}
