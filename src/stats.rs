use crate::models::{ChatMessage, Role, SearchHistoryItem};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Aggregate usage figures derived from the local histories.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct UsageStats {
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub total_tokens: u64,
    pub faq_enhanced_responses: usize,
    pub total_searches: usize,
    pub unique_queries: usize,
    pub total_results: usize,
    pub average_results: f64,
    /// Percentage of assistant messages that carried FAQ context.
    pub faq_usage_rate: f64,
    /// Percentage of searches that returned at least one result.
    pub search_success_rate: f64,
    pub average_tokens_per_response: f64,
}

impl UsageStats {
    pub fn compute(chat: &[ChatMessage], searches: &[SearchHistoryItem]) -> Self {
        let user_messages = chat.iter().filter(|m| m.role == Role::User).count();
        let assistant_messages = chat.iter().filter(|m| m.role == Role::Assistant).count();
        let total_tokens: u64 = chat
            .iter()
            .filter_map(|m| m.usage.map(|u| u.total_tokens))
            .sum();
        let faq_enhanced_responses = chat.iter().filter(|m| m.faq_context.is_some()).count();

        let total_searches = searches.len();
        let unique_queries = searches
            .iter()
            .map(|s| s.query.as_str())
            .collect::<HashSet<_>>()
            .len();
        let total_results: usize = searches.iter().map(|s| s.result_count).sum();
        let successful = searches.iter().filter(|s| s.result_count > 0).count();

        Self {
            user_messages,
            assistant_messages,
            total_tokens,
            faq_enhanced_responses,
            total_searches,
            unique_queries,
            total_results,
            average_results: ratio(total_results as f64, total_searches),
            faq_usage_rate: ratio(faq_enhanced_responses as f64, assistant_messages) * 100.0,
            search_success_rate: ratio(successful as f64, total_searches) * 100.0,
            average_tokens_per_response: ratio(total_tokens as f64, assistant_messages),
        }
    }
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Chat(Role),
    Search,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ActivityItem {
    pub kind: ActivityKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

/// Chat and search entries merged newest first, at most `limit` of them.
pub fn recent_activity(
    chat: &[ChatMessage],
    searches: &[SearchHistoryItem],
    limit: usize,
) -> Vec<ActivityItem> {
    let mut activity: Vec<ActivityItem> = chat
        .iter()
        .map(|m| ActivityItem {
            kind: ActivityKind::Chat(m.role),
            content: m.content.clone(),
            timestamp: m.timestamp,
            extra: None,
        })
        .chain(searches.iter().map(|s| ActivityItem {
            kind: ActivityKind::Search,
            content: s.query.clone(),
            timestamp: s.timestamp,
            extra: Some(format!("{} results", s.result_count)),
        }))
        .collect();
    activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activity.truncate(limit);
    activity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenUsage;
    use chrono::{Duration, TimeZone};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn search(query: &str, count: usize, minute: i64) -> SearchHistoryItem {
        SearchHistoryItem {
            timestamp: at(minute),
            ..SearchHistoryItem::new(query, count)
        }
    }

    fn reply(tokens: u64, with_context: bool, minute: i64) -> ChatMessage {
        let mut message = ChatMessage::assistant("answer");
        message.timestamp = at(minute);
        message.usage = Some(TokenUsage {
            prompt_tokens: tokens / 2,
            completion_tokens: tokens - tokens / 2,
            total_tokens: tokens,
        });
        message.faq_context = with_context.then(|| "context".to_string());
        message
    }

    #[test]
    fn empty_histories_have_zero_rates() {
        let stats = UsageStats::compute(&[], &[]);
        assert_eq!(stats, UsageStats::default());
    }

    #[test]
    fn only_user_messages_do_not_divide_by_zero() {
        let stats = UsageStats::compute(&[ChatMessage::user("hi")], &[]);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.faq_usage_rate, 0.0);
        assert_eq!(stats.average_tokens_per_response, 0.0);
    }

    #[test]
    fn aggregates_chat_and_search() {
        let chat = vec![
            ChatMessage::user("q1"),
            reply(100, true, 1),
            ChatMessage::user("q2"),
            reply(50, false, 2),
            ChatMessage::assistant("Error: HTTP 500: Internal Server Error"),
        ];
        let searches = vec![
            search("refund policy", 4, 3),
            search("refund policy", 2, 4),
            search("warranty", 0, 5),
        ];
        let stats = UsageStats::compute(&chat, &searches);

        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 3);
        assert_eq!(stats.total_tokens, 150);
        assert_eq!(stats.faq_enhanced_responses, 1);
        assert_eq!(stats.total_searches, 3);
        assert_eq!(stats.unique_queries, 2);
        assert_eq!(stats.total_results, 6);
        assert_eq!(stats.average_results, 2.0);
        assert!((stats.faq_usage_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!((stats.search_success_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.average_tokens_per_response, 50.0);
    }

    #[test]
    fn recent_activity_is_newest_first_and_bounded() {
        let chat: Vec<ChatMessage> = (0..8).map(|i| reply(1, false, i * 2)).collect();
        let searches: Vec<SearchHistoryItem> =
            (0..8).map(|i| search(&format!("q{}", i), 1, i * 2 + 1)).collect();

        let activity = recent_activity(&chat, &searches, RECENT_ACTIVITY_LIMIT);

        assert_eq!(activity.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(activity[0].kind, ActivityKind::Search);
        assert_eq!(activity[0].content, "q7");
        assert_eq!(activity[0].extra.as_deref(), Some("1 results"));
        assert_eq!(activity[1].kind, ActivityKind::Chat(Role::Assistant));
        assert!(activity.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}
