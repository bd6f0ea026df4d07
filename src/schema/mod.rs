//! Structural type descriptions for cognitive-function responses.
//!
//! Every cognitive function that requests generated data declares the shape
//! it expects as a closed JSON-Schema object description. The set of
//! functions is a closed enum, so there is no runtime "unknown key"
//! ambiguity: the registry is built once at process start, is read-only
//! thereafter, and concurrent readers need no locking.

pub mod responses;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub use responses::{validate, TypedResponse};

// ---------------------------------------------------------------------------
// Function identifiers
// ---------------------------------------------------------------------------

/// The cognitive functions with a registered response shape.
///
/// Identifier strings are stable and used as registry keys, log labels, and
/// the `name` of the wire-level schema envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveFunction {
    // Planning
    WakeUpHour,
    DailyPlan,
    HourlySchedule,
    TaskDecomp,
    NewDecompSchedule,
    // Perception
    ActionLocation,
    Pronunciatio,
    EventTriple,
    ActObjDesc,
    // Retrieval
    ExtractKeywords,
    KeywordToThoughts,
    ConvoToThoughts,
    // Reflection
    Poignancy,
    FocalPt,
    InsightAndGuidance,
    // Conversation
    DecideToTalk,
    DecideToReact,
    CreateConversation,
    SummarizeConversation,
    AgentChatSummarizeIdeas,
    AgentChatSummarizeRelationship,
    AgentChat,
    GenerateNextConvoLine,
    WhisperInnerThought,
    PlanningThoughtOnConvo,
    MemoOnConvo,
    // Execution
    ActionSector,
    ActionArena,
    ActionGameObject,
    // Utility
    SummarizeIdeas,
}

impl CognitiveFunction {
    /// All registered functions, in registry order.
    pub const ALL: &'static [CognitiveFunction] = &[
        Self::WakeUpHour,
        Self::DailyPlan,
        Self::HourlySchedule,
        Self::TaskDecomp,
        Self::NewDecompSchedule,
        Self::ActionLocation,
        Self::Pronunciatio,
        Self::EventTriple,
        Self::ActObjDesc,
        Self::ExtractKeywords,
        Self::KeywordToThoughts,
        Self::ConvoToThoughts,
        Self::Poignancy,
        Self::FocalPt,
        Self::InsightAndGuidance,
        Self::DecideToTalk,
        Self::DecideToReact,
        Self::CreateConversation,
        Self::SummarizeConversation,
        Self::AgentChatSummarizeIdeas,
        Self::AgentChatSummarizeRelationship,
        Self::AgentChat,
        Self::GenerateNextConvoLine,
        Self::WhisperInnerThought,
        Self::PlanningThoughtOnConvo,
        Self::MemoOnConvo,
        Self::ActionSector,
        Self::ActionArena,
        Self::ActionGameObject,
        Self::SummarizeIdeas,
    ];

    /// Stable string identifier for this function.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WakeUpHour => "wake_up_hour",
            Self::DailyPlan => "daily_plan",
            Self::HourlySchedule => "hourly_schedule",
            Self::TaskDecomp => "task_decomp",
            Self::NewDecompSchedule => "new_decomp_schedule",
            Self::ActionLocation => "action_location",
            Self::Pronunciatio => "pronunciatio",
            Self::EventTriple => "event_triple",
            Self::ActObjDesc => "act_obj_desc",
            Self::ExtractKeywords => "extract_keywords",
            Self::KeywordToThoughts => "keyword_to_thoughts",
            Self::ConvoToThoughts => "convo_to_thoughts",
            Self::Poignancy => "poignancy",
            Self::FocalPt => "focal_pt",
            Self::InsightAndGuidance => "insight_and_guidance",
            Self::DecideToTalk => "decide_to_talk",
            Self::DecideToReact => "decide_to_react",
            Self::CreateConversation => "create_conversation",
            Self::SummarizeConversation => "summarize_conversation",
            Self::AgentChatSummarizeIdeas => "agent_chat_summarize_ideas",
            Self::AgentChatSummarizeRelationship => "agent_chat_summarize_relationship",
            Self::AgentChat => "agent_chat",
            Self::GenerateNextConvoLine => "generate_next_convo_line",
            Self::WhisperInnerThought => "whisper_inner_thought",
            Self::PlanningThoughtOnConvo => "planning_thought_on_convo",
            Self::MemoOnConvo => "memo_on_convo",
            Self::ActionSector => "action_sector",
            Self::ActionArena => "action_arena",
            Self::ActionGameObject => "action_game_object",
            Self::SummarizeIdeas => "summarize_ideas",
        }
    }

    /// Look up a function by its stable string identifier.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == identifier)
    }

    /// The closed JSON-Schema description of this function's response.
    pub fn schema(&self) -> &'static Value {
        SCHEMAS
            .get(self)
            .expect("every cognitive function has a registered schema")
    }
}

impl std::fmt::Display for CognitiveFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Schema closing
// ---------------------------------------------------------------------------

/// Recursively force `additionalProperties: false` on every object level.
///
/// Provider-side strict decoding only rejects padded keys when every nested
/// object in the submitted schema is closed; a single open level would let
/// syntactically valid but semantically padded output through.
pub fn close_schema(schema: Value) -> Value {
    match schema {
        Value::Object(obj) => {
            let is_object_type = obj.get("type").and_then(|t| t.as_str()) == Some("object");
            let mut closed = Map::new();
            for (key, value) in obj {
                closed.insert(key, close_schema(value));
            }
            if is_object_type {
                closed.insert("additionalProperties".to_string(), Value::Bool(false));
            }
            Value::Object(closed)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(close_schema).collect()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

fn utterance_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "speaker": {"type": "string"},
            "utterance": {"type": "string"}
        },
        "required": ["speaker", "utterance"]
    })
}

fn single_string_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: {"type": "string"} },
        "required": [field]
    })
}

fn build_schema(function: CognitiveFunction) -> Value {
    use CognitiveFunction as F;
    let schema = match function {
        F::WakeUpHour => json!({
            "type": "object",
            "properties": {
                "wake_up_hour": {"type": "integer", "minimum": 0, "maximum": 23}
            },
            "required": ["wake_up_hour"]
        }),
        F::DailyPlan => json!({
            "type": "object",
            "properties": {
                "activities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "activity": {"type": "string"},
                            "time": {"type": "string"}
                        },
                        "required": ["activity", "time"]
                    }
                }
            },
            "required": ["activities"]
        }),
        F::HourlySchedule => json!({
            "type": "object",
            "properties": {
                "activities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "activity": {"type": "string"},
                            "start_time": {"type": "string"},
                            "end_time": {"type": "string"},
                            "duration_minutes": {"type": "integer", "minimum": 1}
                        },
                        "required": ["activity", "start_time", "end_time", "duration_minutes"]
                    }
                }
            },
            "required": ["activities"]
        }),
        F::TaskDecomp => json!({
            "type": "object",
            "properties": {
                "subtasks": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "description": {"type": "string"},
                            "duration_minutes": {"type": "integer", "minimum": 1, "maximum": 180}
                        },
                        "required": ["description", "duration_minutes"]
                    }
                }
            },
            "required": ["subtasks"]
        }),
        F::NewDecompSchedule => json!({
            "type": "object",
            "properties": {
                "schedule": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "task": {"type": "string"},
                            "duration": {"type": "integer", "minimum": 1}
                        },
                        "required": ["task", "duration"]
                    }
                }
            },
            "required": ["schedule"]
        }),
        F::ActionLocation => json!({
            "type": "object",
            "properties": {
                "sector": {"type": "string"},
                "arena": {"type": "string"},
                "game_object": {"type": "string"}
            },
            "required": ["sector", "arena", "game_object"]
        }),
        F::Pronunciatio => json!({
            "type": "object",
            "properties": {
                "emoji": {"type": "string"},
                "description": {"type": "string"}
            },
            "required": ["emoji", "description"]
        }),
        F::EventTriple => json!({
            "type": "object",
            "properties": {
                "subject": {"type": "string"},
                "predicate": {"type": "string"},
                "object": {"type": "string"}
            },
            "required": ["subject", "predicate", "object"]
        }),
        F::ActObjDesc => single_string_schema("description"),
        F::ExtractKeywords => json!({
            "type": "object",
            "properties": {
                "keywords": {
                    "type": "array",
                    "minItems": 1,
                    "maxItems": 10,
                    "items": {"type": "string"}
                }
            },
            "required": ["keywords"]
        }),
        F::KeywordToThoughts | F::ConvoToThoughts | F::WhisperInnerThought
        | F::PlanningThoughtOnConvo => single_string_schema("thought"),
        F::Poignancy => json!({
            "type": "object",
            "properties": {
                "rating": {"type": "integer", "minimum": 1, "maximum": 10},
                "reasoning": {"type": "string"}
            },
            "required": ["rating"]
        }),
        F::FocalPt => json!({
            "type": "object",
            "properties": {
                "focal_points": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "topic": {"type": "string"},
                            "description": {"type": "string"}
                        },
                        "required": ["topic", "description"]
                    }
                }
            },
            "required": ["focal_points"]
        }),
        F::InsightAndGuidance => json!({
            "type": "object",
            "properties": {
                "insights": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "properties": {
                            "insight": {"type": "string"},
                            "evidence": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["insight", "evidence"]
                    }
                }
            },
            "required": ["insights"]
        }),
        F::DecideToTalk | F::DecideToReact => json!({
            "type": "object",
            "properties": {
                "decision": {"type": "string", "enum": ["yes", "no"]},
                "reasoning": {"type": "string"}
            },
            "required": ["decision"]
        }),
        F::CreateConversation => json!({
            "type": "object",
            "properties": {
                "conversation": {"type": "array", "minItems": 1, "items": utterance_schema()}
            },
            "required": ["conversation"]
        }),
        F::SummarizeConversation => json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "key_points": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["summary"]
        }),
        F::AgentChatSummarizeIdeas => json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "topics": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["summary", "topics"]
        }),
        F::AgentChatSummarizeRelationship => json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string"},
                "sentiment": {"type": "string", "enum": ["positive", "neutral", "negative"]}
            },
            "required": ["summary"]
        }),
        F::AgentChat => json!({
            "type": "object",
            "properties": {
                "dialogue": {"type": "array", "items": utterance_schema()}
            },
            "required": ["dialogue"]
        }),
        F::GenerateNextConvoLine => single_string_schema("utterance"),
        F::MemoOnConvo => single_string_schema("memo"),
        F::ActionSector => single_string_schema("sector"),
        F::ActionArena => single_string_schema("arena"),
        F::ActionGameObject => single_string_schema("game_object"),
        F::SummarizeIdeas => single_string_schema("summary"),
    };
    close_schema(schema)
}

/// Process-wide registry of closed response schemas, built once at first use
/// and never mutated thereafter.
static SCHEMAS: Lazy<HashMap<CognitiveFunction, Value>> = Lazy::new(|| {
    CognitiveFunction::ALL
        .iter()
        .map(|f| (*f, build_schema(*f)))
        .collect()
});
