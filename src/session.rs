use crate::api::FaqApi;
use crate::error::ApiError;
use crate::history::HistoryStore;
use crate::models::{ChatMessage, FaqResult, SearchHistoryItem};
use std::sync::Arc;

pub const ALL_CATEGORIES: &str = "all";

// --- Chat ---

/// A chat transcript bound to its persisted copy.
///
/// Every mutation writes the whole transcript back to the history store.
pub struct ChatSession {
    api: Arc<dyn FaqApi>,
    history: HistoryStore,
    messages: Vec<ChatMessage>,
    system_prompt: String,
    // False while the stored transcript has not been read; writes wait until it has.
    synced: bool,
}

impl ChatSession {
    /// Resumes from whatever transcript the history store holds.
    pub async fn restore(api: Arc<dyn FaqApi>, history: HistoryStore, system_prompt: impl Into<String>) -> Self {
        let (messages, synced) = match history.try_load_chat_history().await {
            Some(messages) => (messages, true),
            None => {
                log::warn!("Stored chat transcript unreadable, starting empty");
                (Vec::new(), false)
            }
        };
        log::info!("Restored chat session with {} messages", messages.len());
        Self {
            api,
            history,
            messages,
            system_prompt: system_prompt.into(),
            synced,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Sends `input` and appends both sides of the exchange.
    ///
    /// A failed call still produces an assistant entry carrying the diagnostic, so the
    /// user's message is never lost. Returns the appended reply, or `None` for blank input.
    pub async fn send(&mut self, input: &str) -> Option<ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }
        self.push(ChatMessage::user(input)).await;

        let reply = match self.api.chat(input, Some(self.system_prompt.as_str())).await {
            Ok(response) => ChatMessage::from_response(&response),
            Err(e) => {
                log::warn!("Chat request failed: {}", e);
                ChatMessage::from_error(&e)
            }
        };
        self.push(reply.clone()).await;
        Some(reply)
    }

    pub async fn clear(&mut self) {
        self.messages.clear();
        self.synced = true;
        self.history.save_chat_history(&self.messages).await;
    }

    async fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.sync().await {
            self.history.save_chat_history(&self.messages).await;
        } else {
            log::warn!("Stored chat transcript still unreadable, not saving");
        }
    }

    /// Retries a failed restore, putting the stored transcript ahead of the messages
    /// gathered since. Returns whether the stored copy may be overwritten.
    async fn sync(&mut self) -> bool {
        if self.synced {
            return true;
        }
        let Some(mut stored) = self.history.try_load_chat_history().await else {
            return false;
        };
        log::info!("Recovered {} stored chat messages", stored.len());
        stored.append(&mut self.messages);
        self.messages = stored;
        self.synced = true;
        true
    }
}

// --- Search ---

/// Latest FAQ search results plus the category filter applied to them.
pub struct SearchSession {
    api: Arc<dyn FaqApi>,
    history: HistoryStore,
    results: Vec<FaqResult>,
    error: Option<String>,
    selected_category: String,
    recent: Vec<SearchHistoryItem>,
}

impl SearchSession {
    pub async fn restore(api: Arc<dyn FaqApi>, history: HistoryStore) -> Self {
        let recent = history.load_search_history().await;
        Self {
            api,
            history,
            results: Vec::new(),
            error: None,
            selected_category: ALL_CATEGORIES.to_string(),
            recent,
        }
    }

    /// Runs a search and records it in the history on success.
    ///
    /// Blank queries are rejected without touching the session. On failure the results
    /// are emptied and the diagnostic is kept for display.
    pub async fn search(&mut self, query: &str, max_results: u32) -> Result<usize, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::Invalid("Search query must not be empty".to_string()));
        }
        self.error = None;
        self.selected_category = ALL_CATEGORIES.to_string();

        match self.api.search_faq(query, max_results).await {
            Ok(response) => {
                self.results = response.results;
                self.history.add_search(query, response.count).await;
                self.recent = self.history.load_search_history().await;
                Ok(response.count)
            }
            Err(e) => {
                self.results.clear();
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn results(&self) -> &[FaqResult] {
        &self.results
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn recent_searches(&self) -> &[SearchHistoryItem] {
        &self.recent
    }

    pub async fn clear_history(&mut self) {
        self.history.clear_search_history().await;
        self.recent.clear();
    }

    /// `"all"` followed by each distinct category in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories = vec![ALL_CATEGORIES.to_string()];
        for result in &self.results {
            if !categories.contains(&result.metadata.category) {
                categories.push(result.metadata.category.clone());
            }
        }
        categories
    }

    pub fn select_category(&mut self, category: impl Into<String>) {
        self.selected_category = category.into();
    }

    pub fn selected_category(&self) -> &str {
        &self.selected_category
    }

    pub fn filtered_results(&self) -> Vec<&FaqResult> {
        self.results
            .iter()
            .filter(|r| {
                self.selected_category == ALL_CATEGORIES
                    || r.metadata.category == self.selected_category
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use crate::storage::testing::FlakyStore;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    // Answers from canned data; goes "offline" when `offline` is set.
    struct CannedApi {
        offline: bool,
    }

    fn faq(id: i64, category: &str, score: f64) -> FaqResult {
        FaqResult {
            content: format!("answer {}", id),
            metadata: FaqMetadata {
                id,
                title: format!("FAQ {}", id),
                category: category.to_string(),
                sub_category: "general".to_string(),
            },
            similarity_score: score,
        }
    }

    fn offline() -> ApiError {
        ApiError::Transport("error sending request for url (http://localhost:8001/chat)".to_string())
    }

    #[async_trait]
    impl FaqApi for CannedApi {
        async fn check_health(&self) -> Result<HealthStatus, ApiError> {
            unimplemented!()
        }
        async fn search_faq(&self, query: &str, max_results: u32) -> Result<SearchResponse, ApiError> {
            if self.offline {
                return Err(offline());
            }
            let results: Vec<FaqResult> = vec![faq(1, "billing", 0.9), faq(2, "shipping", 0.7), faq(3, "billing", 0.4)]
                .into_iter()
                .take(max_results as usize)
                .collect();
            Ok(SearchResponse {
                query: query.to_string(),
                count: results.len(),
                results,
                status: "success".to_string(),
            })
        }
        async fn chat(&self, message: &str, system_prompt: Option<&str>) -> Result<ChatResponse, ApiError> {
            if self.offline {
                return Err(offline());
            }
            Ok(ChatResponse {
                response: format!("[{}] {}", system_prompt.unwrap_or_default(), message),
                faq_context: Some("FAQ 1".to_string()),
                usage: TokenUsage { prompt_tokens: 3, completion_tokens: 4, total_tokens: 7 },
                faq_used: true,
                status: "success".to_string(),
            })
        }
        async fn simple_chat(&self, _: &str) -> Result<ChatResponse, ApiError> {
            unimplemented!()
        }
        async fn generate_course_lesson(&self, _: &LessonRequest) -> Result<LessonResponse, ApiError> {
            unimplemented!()
        }
        async fn generate_mcq(&self, _: &McqRequest) -> Result<McqResponse, ApiError> {
            unimplemented!()
        }
    }

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn chat_appends_and_persists_exchange() {
        let history = history();
        let mut session =
            ChatSession::restore(Arc::new(CannedApi { offline: false }), history.clone(), "Be brief.").await;

        let reply = session.send("How do refunds work?").await.unwrap();

        assert_eq!(reply.content, "[Be brief.] How do refunds work?");
        assert_eq!(reply.usage.map(|u| u.total_tokens), Some(7));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, Role::User);
        assert_eq!(history.load_chat_history().await, session.messages());
    }

    #[tokio::test]
    async fn offline_chat_keeps_user_message_and_reports_error() {
        let history = history();
        let mut session =
            ChatSession::restore(Arc::new(CannedApi { offline: true }), history.clone(), "prompt").await;

        let reply = session.send("Are you there?").await.unwrap();

        assert_eq!(reply.role, Role::Assistant);
        assert!(reply.content.starts_with("Error: "));
        assert!(reply.content.len() > "Error: ".len());
        let stored = history.load_chat_history().await;
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].content, "Are you there?");
    }

    #[tokio::test]
    async fn blank_chat_input_is_ignored() {
        let mut session = ChatSession::restore(Arc::new(CannedApi { offline: false }), history(), "p").await;
        assert!(session.send("   ").await.is_none());
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn chat_resumes_and_clears() {
        let history = history();
        history.save_chat_history(&[ChatMessage::user("earlier")]).await;
        let mut session = ChatSession::restore(Arc::new(CannedApi { offline: false }), history.clone(), "p").await;
        assert_eq!(session.messages().len(), 1);

        session.clear().await;
        assert!(session.messages().is_empty());
        assert!(history.load_chat_history().await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_transcript_is_not_overwritten() {
        let backend = Arc::new(FlakyStore::default());
        let history = HistoryStore::new(backend.clone());
        let earlier = vec![ChatMessage::user("first"), ChatMessage::assistant("second")];
        history.save_chat_history(&earlier).await;

        backend.fail_next_gets(1);
        let mut session = ChatSession::restore(Arc::new(CannedApi { offline: false }), history.clone(), "p").await;
        assert!(session.messages().is_empty());

        session.send("third").await.unwrap();

        let stored = history.load_chat_history().await;
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[0], earlier[0]);
        assert_eq!(stored[2].content, "third");
        assert_eq!(session.messages(), stored.as_slice());
    }

    #[tokio::test]
    async fn persistently_unreadable_transcript_is_left_alone() {
        let backend = Arc::new(FlakyStore::default());
        let history = HistoryStore::new(backend.clone());
        history.save_chat_history(&[ChatMessage::user("keep me")]).await;

        backend.fail_next_gets(3);
        let mut session = ChatSession::restore(Arc::new(CannedApi { offline: false }), history.clone(), "p").await;
        session.send("hello").await.unwrap();

        let stored = history.load_chat_history().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "keep me");
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn search_records_history_and_filters() {
        let history = history();
        let mut session = SearchSession::restore(Arc::new(CannedApi { offline: false }), history.clone()).await;

        let count = session.search("refund policy", 5).await.unwrap();

        assert_eq!(count, 3);
        assert_eq!(session.results().len(), 3);
        assert!(session.results().iter().all(|r| (0.0..=1.0).contains(&r.similarity_score)));
        assert_eq!(session.categories(), vec!["all", "billing", "shipping"]);
        assert_eq!(session.recent_searches()[0].query, "refund policy");
        assert_eq!(session.recent_searches()[0].result_count, 3);

        session.select_category("billing");
        assert_eq!(session.filtered_results().len(), 2);
        session.select_category(ALL_CATEGORIES);
        assert_eq!(session.filtered_results().len(), 3);
    }

    #[tokio::test]
    async fn failed_search_clears_results_without_history() {
        let history = history();
        let mut session = SearchSession::restore(Arc::new(CannedApi { offline: true }), history.clone()).await;

        assert!(session.search("refund policy", 5).await.is_err());
        assert!(session.results().is_empty());
        assert!(session.error().is_some());
        assert!(history.load_search_history().await.is_empty());
    }

    #[tokio::test]
    async fn clearing_history_empties_recent_searches() {
        let history = history();
        let mut session = SearchSession::restore(Arc::new(CannedApi { offline: false }), history.clone()).await;
        session.search("refund policy", 5).await.unwrap();
        assert_eq!(session.recent_searches().len(), 1);

        session.clear_history().await;

        assert!(session.recent_searches().is_empty());
        assert!(history.load_search_history().await.is_empty());
        assert_eq!(session.results().len(), 3);
    }

    #[tokio::test]
    async fn blank_search_is_rejected() {
        let mut session = SearchSession::restore(Arc::new(CannedApi { offline: false }), history()).await;
        assert!(matches!(session.search("", 5).await, Err(ApiError::Invalid(_))));
        assert!(session.error().is_none());
    }
}
