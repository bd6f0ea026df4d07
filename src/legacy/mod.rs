//! Projection of typed values into legacy plain-data shapes.
//!
//! Many call sites predate the typed validation layer and still expect
//! loosely-typed results: lists of pairs, bare integers, bare strings. This
//! mapping keeps those call sites stable while the typed layer evolves
//! independently. Functions with no special projection get the typed
//! value's full field map unmodified.

use serde_json::{json, Value};

use crate::schema::responses::Decision;
use crate::schema::{CognitiveFunction, TypedResponse};

/// Project a validated value into the plain-data shape expected by
/// `function`'s callers.
pub fn to_domain_shape(response: &TypedResponse, function: CognitiveFunction) -> Value {
    use CognitiveFunction as F;
    use TypedResponse as R;

    match (function, response) {
        // [[description, duration], ...]
        (F::TaskDecomp, R::TaskDecomp(r)) => json!(r
            .subtasks
            .iter()
            .map(|s| json!([s.description, s.duration_minutes]))
            .collect::<Vec<_>>()),

        // ["activity at time", ...]
        (F::DailyPlan, R::DailyPlan(r)) => json!(r
            .activities
            .iter()
            .map(|a| format!("{} at {}", a.activity, a.time))
            .collect::<Vec<_>>()),

        // [[activity, duration], ...]
        (F::HourlySchedule, R::HourlySchedule(r)) => json!(r
            .activities
            .iter()
            .map(|a| json!([a.activity, a.duration_minutes]))
            .collect::<Vec<_>>()),
        (F::NewDecompSchedule, R::NewDecompSchedule(r)) => json!(r
            .schedule
            .iter()
            .map(|item| json!([item.task, item.duration]))
            .collect::<Vec<_>>()),

        // Bare integers
        (F::WakeUpHour, R::WakeUpHour(r)) => json!(r.wake_up_hour),
        (F::Poignancy, R::Poignancy(r)) => json!(r.rating),

        // Lists of strings
        (F::ExtractKeywords, R::Keywords(r)) => json!(r.keywords),

        // [subject, predicate, object]
        (F::EventTriple, R::EventTriple(r)) => json!([r.subject, r.predicate, r.object]),

        // [[speaker, utterance], ...]
        (F::CreateConversation, R::Conversation(r)) => json!(r
            .conversation
            .iter()
            .map(|u| json!([u.speaker, u.utterance]))
            .collect::<Vec<_>>()),
        (F::AgentChat, R::AgentChat(r)) => json!(r
            .dialogue
            .iter()
            .map(|u| json!([u.speaker, u.utterance]))
            .collect::<Vec<_>>()),

        // Booleans
        (F::DecideToTalk | F::DecideToReact, R::Decision(r)) => {
            json!(r.decision == Decision::Yes)
        }

        // Bare strings
        (F::ActionSector, R::Sector(r)) => json!(r.sector),
        (F::ActionArena, R::Arena(r)) => json!(r.arena),
        (F::ActionGameObject, R::GameObject(r)) => json!(r.game_object),
        (F::ActObjDesc, R::ActObjDesc(r)) => json!(r.description),
        (F::GenerateNextConvoLine, R::NextConvoLine(r)) => json!(r.utterance),
        (F::KeywordToThoughts | F::ConvoToThoughts | F::WhisperInnerThought
            | F::PlanningThoughtOnConvo, R::Thought(r)) => json!(r.thought),
        (F::MemoOnConvo, R::ConversationMemo(r)) => json!(r.memo),
        (F::SummarizeIdeas, R::SummarizeIdeas(r)) => json!(r.summary),

        // Everything else keeps its full field map.
        _ => response.to_value(),
    }
}
