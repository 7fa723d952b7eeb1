use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::history::generate_id;

// --- Remote service payloads ---
//
// Response types default every field so that a 2xx body missing some of them still
// decodes; the backend is trusted for shape, not validated.

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub model: String,
    pub provider: String,
    pub faq_records: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FaqMetadata {
    pub id: i64,
    pub title: String,
    pub category: String,
    pub sub_category: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct FaqResult {
    pub content: String,
    pub metadata: FaqMetadata,
    pub similarity_score: f64, // 0.0..=1.0
}

/// Coarse grouping of a similarity score, used when rendering results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityBand {
    High,
    Medium,
    Low,
}

impl FaqResult {
    pub fn similarity_band(&self) -> SimilarityBand {
        if self.similarity_score > 0.8 {
            SimilarityBand::High
        } else if self.similarity_score > 0.6 {
            SimilarityBand::Medium
        } else {
            SimilarityBand::Low
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<FaqResult>,
    pub count: usize,
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub system_prompt: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faq_context: Option<String>,
    pub usage: TokenUsage,
    pub faq_used: bool,
    pub status: String,
}

// --- Creator studio ---

pub const MAX_MCQ_QUESTIONS: u32 = 50;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LessonRequest {
    pub topic: String,
    pub difficulty_level: String,
    pub lesson_duration: String,
    pub include_examples: bool,
    pub include_exercises: bool,
}

impl LessonRequest {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.topic.trim().is_empty() {
            return Err(ApiError::Invalid("Please enter a topic".to_string()));
        }
        Ok(())
    }
}

impl Default for LessonRequest {
    fn default() -> Self {
        Self {
            topic: String::new(),
            difficulty_level: "intermediate".to_string(),
            lesson_duration: "60 minutes".to_string(),
            include_examples: true,
            include_exercises: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct LessonResponse {
    pub topic: String,
    pub lesson_content: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct McqRequest {
    pub topic: String,
    pub number_of_questions: u32,
    pub difficulty_level: String,
}

impl McqRequest {
    pub fn new(topic: impl Into<String>, number_of_questions: u32) -> Self {
        Self {
            topic: topic.into(),
            number_of_questions,
            difficulty_level: "intermediate".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.topic.trim().is_empty() {
            return Err(ApiError::Invalid("Please enter a topic".to_string()));
        }
        if !(1..=MAX_MCQ_QUESTIONS).contains(&self.number_of_questions) {
            return Err(ApiError::Invalid(format!(
                "Number of questions must be between 1 and {}",
                MAX_MCQ_QUESTIONS
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct McqQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct McqResponse {
    pub topic: String,
    pub total_questions: u32,
    pub questions: Vec<McqQuestion>,
}

// --- Locally persisted history ---

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

// A single entry of the chat transcript
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    #[serde(rename = "type", alias = "role")]
    pub role: Role,
    pub content: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faq_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            role,
            content: content.into(),
            timestamp: now(),
            faq_context: None,
            usage: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Builds the assistant entry for a successful chat reply.
    pub fn from_response(response: &ChatResponse) -> Self {
        Self {
            faq_context: response.faq_context.clone(),
            usage: Some(response.usage),
            ..Self::assistant(response.response.clone())
        }
    }

    /// Builds the assistant entry shown in place of a reply when the call failed.
    pub fn from_error(error: &ApiError) -> Self {
        Self::assistant(format!("Error: {}", error))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryItem {
    pub id: String,
    pub query: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
}

impl SearchHistoryItem {
    pub fn new(query: impl Into<String>, result_count: usize) -> Self {
        Self {
            id: generate_id(),
            query: query.into(),
            timestamp: now(),
            result_count,
        }
    }
}

/// User-triggered dump of both histories.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub chat_history: Vec<ChatMessage>,
    pub search_history: Vec<SearchHistoryItem>,
    #[serde(with = "timestamp")]
    pub export_date: DateTime<Utc>,
}

impl ExportBundle {
    pub fn file_name(&self) -> String {
        format!("faq-assistant-data-{}.json", self.export_date.format("%Y-%m-%d"))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Current time at the precision the persisted form keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Short human form, e.g. `Oct 19, 02:05 PM`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d, %I:%M %p").to_string()
}

/// Persisted timestamps are ISO-8601 text; epoch milliseconds are accepted on load.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        match Stored::deserialize(deserializer)? {
            Stored::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| de::Error::custom(format!("invalid timestamp '{}': {}", text, e))),
            Stored::Millis(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", millis))),
        }
    }
}
