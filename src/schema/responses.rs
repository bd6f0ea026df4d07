//! Typed values decoded from generated text.
//!
//! One struct per response shape, each carrying the declared constraints of
//! its fields. [`validate`] is the only way in: it parses raw provider text,
//! decodes it into the shape registered for the requested function, and
//! checks every constraint before a value is released. Validation is
//! all-or-nothing: a single violated field invalidates the whole value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::schedule::Subtask;

use super::CognitiveFunction;

// ---------------------------------------------------------------------------
// Constraint checking
// ---------------------------------------------------------------------------

trait Check {
    /// Verify every declared field constraint.
    fn check(&self) -> Result<(), ValidationError>;
}

fn check_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::constraint(
            field,
            format!("{value} is outside the range {min}..={max}"),
        ));
    }
    Ok(())
}

fn check_min(field: &str, value: i64, min: i64) -> Result<(), ValidationError> {
    if value < min {
        return Err(ValidationError::constraint(
            field,
            format!("{value} is below the minimum of {min}"),
        ));
    }
    Ok(())
}

fn check_min_items(field: &str, len: usize, min: usize) -> Result<(), ValidationError> {
    if len < min {
        return Err(ValidationError::constraint(
            field,
            format!("{len} item(s), expected at least {min}"),
        ));
    }
    Ok(())
}

fn check_max_items(field: &str, len: usize, max: usize) -> Result<(), ValidationError> {
    if len > max {
        return Err(ValidationError::constraint(
            field,
            format!("{len} item(s), expected at most {max}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Planning shapes
// ---------------------------------------------------------------------------

/// Hour (0-23) at which the persona wakes up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakeUpHourResponse {
    pub wake_up_hour: i64,
}

impl Check for WakeUpHourResponse {
    fn check(&self) -> Result<(), ValidationError> {
        check_range("wake_up_hour", self.wake_up_hour, 0, 23)
    }
}

/// A single broad-strokes activity in the daily plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlanActivity {
    pub activity: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlanResponse {
    pub activities: Vec<DailyPlanActivity>,
}

impl Check for DailyPlanResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// A single activity within one scheduled hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyScheduleActivity {
    pub activity: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyScheduleResponse {
    pub activities: Vec<HourlyScheduleActivity>,
}

impl Check for HourlyScheduleResponse {
    fn check(&self) -> Result<(), ValidationError> {
        for (i, activity) in self.activities.iter().enumerate() {
            check_min(
                &format!("activities[{i}].duration_minutes"),
                activity.duration_minutes,
                1,
            )?;
        }
        Ok(())
    }
}

/// A task broken down into small time increments.
///
/// Durations here are what the provider claims; the schedule normalizer is
/// responsible for making them sum to the real target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDecomposition {
    pub subtasks: Vec<Subtask>,
}

impl Check for TaskDecomposition {
    fn check(&self) -> Result<(), ValidationError> {
        check_min_items("subtasks", self.subtasks.len(), 1)?;
        for (i, subtask) in self.subtasks.iter().enumerate() {
            check_range(
                &format!("subtasks[{i}].duration_minutes"),
                subtask.duration_minutes,
                1,
                180,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecompScheduleItem {
    pub task: String,
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecompScheduleResponse {
    pub schedule: Vec<NewDecompScheduleItem>,
}

impl Check for NewDecompScheduleResponse {
    fn check(&self) -> Result<(), ValidationError> {
        for (i, item) in self.schedule.iter().enumerate() {
            check_min(&format!("schedule[{i}].duration"), item.duration, 1)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Perception shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLocation {
    pub sector: String,
    pub arena: String,
    pub game_object: String,
}

impl Check for ActionLocation {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pronunciatio {
    pub emoji: String,
    pub description: String,
}

impl Check for Pronunciatio {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Subject-predicate-object triple describing an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Check for EventTriple {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionObjectDescription {
    pub description: String,
}

impl Check for ActionObjectDescription {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Retrieval shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordExtractionResponse {
    pub keywords: Vec<String>,
}

impl Check for KeywordExtractionResponse {
    fn check(&self) -> Result<(), ValidationError> {
        check_min_items("keywords", self.keywords.len(), 1)?;
        check_max_items("keywords", self.keywords.len(), 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtResponse {
    pub thought: String,
}

impl Check for ThoughtResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reflection shapes
// ---------------------------------------------------------------------------

/// Poignancy rating from 1 (mundane) to 10 (extremely significant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoignancyRating {
    pub rating: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Check for PoignancyRating {
    fn check(&self) -> Result<(), ValidationError> {
        check_range("rating", self.rating, 1, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalPoint {
    pub topic: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalPointsResponse {
    pub focal_points: Vec<FocalPoint>,
}

impl Check for FocalPointsResponse {
    fn check(&self) -> Result<(), ValidationError> {
        check_min_items("focal_points", self.focal_points.len(), 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub insight: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub insights: Vec<Insight>,
}

impl Check for InsightsResponse {
    fn check(&self) -> Result<(), ValidationError> {
        check_min_items("insights", self.insights.len(), 1)
    }
}

// ---------------------------------------------------------------------------
// Conversation shapes
// ---------------------------------------------------------------------------

/// Yes/no answer to a talk-or-react question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Check for DecisionResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationUtterance {
    pub speaker: String,
    pub utterance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Vec<ConversationUtterance>,
}

impl Check for ConversationResponse {
    fn check(&self) -> Result<(), ValidationError> {
        check_min_items("conversation", self.conversation.len(), 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
}

impl Check for ConversationSummary {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl Check for RelationshipSummary {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChatSummaryIdeas {
    pub summary: String,
    pub topics: Vec<String>,
}

impl Check for AgentChatSummaryIdeas {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChatResponse {
    pub dialogue: Vec<ConversationUtterance>,
}

impl Check for AgentChatResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextConversationLine {
    pub utterance: String,
}

impl Check for NextConversationLine {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemo {
    pub memo: String,
}

impl Check for ConversationMemo {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Execution and utility shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorResponse {
    pub sector: String,
}

impl Check for SectorResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaResponse {
    pub arena: String,
}

impl Check for ArenaResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObjectResponse {
    pub game_object: String,
}

impl Check for GameObjectResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizeIdeasResponse {
    pub summary: String,
}

impl Check for SummarizeIdeasResponse {
    fn check(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// A validated value, tagged by shape.
///
/// The mapping from [`CognitiveFunction`] to variant is fixed at compile
/// time; [`validate`] is the only producer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedResponse {
    WakeUpHour(WakeUpHourResponse),
    DailyPlan(DailyPlanResponse),
    HourlySchedule(HourlyScheduleResponse),
    TaskDecomp(TaskDecomposition),
    NewDecompSchedule(NewDecompScheduleResponse),
    ActionLocation(ActionLocation),
    Pronunciatio(Pronunciatio),
    EventTriple(EventTriple),
    ActObjDesc(ActionObjectDescription),
    Keywords(KeywordExtractionResponse),
    Thought(ThoughtResponse),
    Poignancy(PoignancyRating),
    FocalPoints(FocalPointsResponse),
    Insights(InsightsResponse),
    Decision(DecisionResponse),
    Conversation(ConversationResponse),
    ConversationSummary(ConversationSummary),
    RelationshipSummary(RelationshipSummary),
    AgentChatSummaryIdeas(AgentChatSummaryIdeas),
    AgentChat(AgentChatResponse),
    NextConvoLine(NextConversationLine),
    ConversationMemo(ConversationMemo),
    Sector(SectorResponse),
    Arena(ArenaResponse),
    GameObject(GameObjectResponse),
    SummarizeIdeas(SummarizeIdeasResponse),
}

impl TypedResponse {
    /// The full field map of the underlying value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).expect("typed responses serialize to plain JSON")
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

static JSON_OBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid salvage pattern"));

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([A-Za-z0-9_]+)`").expect("valid field pattern"));

/// Parse and validate raw provider text against the shape registered for
/// `function`.
///
/// Parsing tolerates prose-wrapped JSON by salvaging the outermost object
/// span before giving up; shape and constraint checking are strict.
pub fn validate(
    function: CognitiveFunction,
    raw_text: &str,
) -> Result<TypedResponse, ValidationError> {
    let value = parse_json(raw_text)?;
    decode(function, value)
}

pub(crate) fn parse_json(raw_text: &str) -> Result<Value, ValidationError> {
    let trimmed = raw_text.trim();
    match serde_json::from_str(trimmed) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            if let Some(candidate) = JSON_OBJECT_RE.find(raw_text) {
                if let Ok(value) = serde_json::from_str(candidate.as_str()) {
                    return Ok(value);
                }
            }
            Err(ValidationError::parse(first_error.to_string()))
        }
    }
}

fn decode(function: CognitiveFunction, value: Value) -> Result<TypedResponse, ValidationError> {
    use CognitiveFunction as F;
    match function {
        F::WakeUpHour => typed(value).map(TypedResponse::WakeUpHour),
        F::DailyPlan => typed(value).map(TypedResponse::DailyPlan),
        F::HourlySchedule => typed(value).map(TypedResponse::HourlySchedule),
        F::TaskDecomp => typed(value).map(TypedResponse::TaskDecomp),
        F::NewDecompSchedule => typed(value).map(TypedResponse::NewDecompSchedule),
        F::ActionLocation => typed(value).map(TypedResponse::ActionLocation),
        F::Pronunciatio => typed(value).map(TypedResponse::Pronunciatio),
        F::EventTriple => typed(value).map(TypedResponse::EventTriple),
        F::ActObjDesc => typed(value).map(TypedResponse::ActObjDesc),
        F::ExtractKeywords => typed(value).map(TypedResponse::Keywords),
        F::KeywordToThoughts | F::ConvoToThoughts => typed(value).map(TypedResponse::Thought),
        F::Poignancy => typed(value).map(TypedResponse::Poignancy),
        F::FocalPt => typed(value).map(TypedResponse::FocalPoints),
        F::InsightAndGuidance => typed(value).map(TypedResponse::Insights),
        F::DecideToTalk | F::DecideToReact => typed(value).map(TypedResponse::Decision),
        F::CreateConversation => typed(value).map(TypedResponse::Conversation),
        F::SummarizeConversation => typed(value).map(TypedResponse::ConversationSummary),
        F::AgentChatSummarizeIdeas => typed(value).map(TypedResponse::AgentChatSummaryIdeas),
        F::AgentChatSummarizeRelationship => typed(value).map(TypedResponse::RelationshipSummary),
        F::AgentChat => typed(value).map(TypedResponse::AgentChat),
        F::GenerateNextConvoLine => typed(value).map(TypedResponse::NextConvoLine),
        F::WhisperInnerThought | F::PlanningThoughtOnConvo => {
            typed(value).map(TypedResponse::Thought)
        }
        F::MemoOnConvo => typed(value).map(TypedResponse::ConversationMemo),
        F::ActionSector => typed(value).map(TypedResponse::Sector),
        F::ActionArena => typed(value).map(TypedResponse::Arena),
        F::ActionGameObject => typed(value).map(TypedResponse::GameObject),
        F::SummarizeIdeas => typed(value).map(TypedResponse::SummarizeIdeas),
    }
}

fn typed<T: DeserializeOwned + Check>(value: Value) -> Result<T, ValidationError> {
    let parsed: T = serde_json::from_value(value).map_err(constraint_from_serde)?;
    parsed.check()?;
    Ok(parsed)
}

/// Map a shape mismatch (missing field, wrong type, unknown enum member)
/// onto a constraint failure naming the offending field where serde's
/// message carries one.
fn constraint_from_serde(error: serde_json::Error) -> ValidationError {
    let message = error.to_string();
    let field = FIELD_NAME_RE
        .captures(&message)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "(root)".to_string());
    ValidationError::constraint(field, message)
}
