// Console commands: the user-facing callers of the gateway and history store.

use crate::models::{format_timestamp, LessonRequest, McqRequest, Role, SimilarityBand};
use crate::state::AppState;
use crate::stats::{recent_activity, ActivityKind, UsageStats, RECENT_ACTIVITY_LIMIT};
use std::fmt::Write;

pub const HELP: &str = "\
Commands:
  health                    check the backend now
  status                    last result of the background health monitor
  search [-n N] <query>     search the FAQ database (N results, default from config)
  filter <category|all>     filter the last search results by category
  chat <message>            ask the assistant (history is kept)
  simple <message>          one-off question through the simple chat endpoint
  prompt [text]             show or set the chat system prompt
  history                   recent searches and chat transcript size
  stats                     usage statistics and recent activity
  export                    write both histories to a JSON file
  clear chat|search         delete a history
  lesson <topic>            generate a course lesson
  mcq <count> <topic>       generate multiple choice questions
  quit                      exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Health,
    Status,
    Search { query: String, max_results: Option<u32> },
    Filter(String),
    Chat(String),
    SimpleChat(String),
    Prompt(Option<String>),
    History,
    Stats,
    Export,
    ClearChat,
    ClearSearch,
    Lesson(String),
    Mcq { topic: String, count: u32 },
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let required = |what: &str| {
            if rest.is_empty() {
                Err(format!("Usage: {} <{}>", verb, what))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "help" | "?" => Ok(Command::Help),
            "health" => Ok(Command::Health),
            "status" => Ok(Command::Status),
            "search" => parse_search(rest),
            "filter" => required("category").map(Command::Filter),
            "chat" => required("message").map(Command::Chat),
            "simple" => required("message").map(Command::SimpleChat),
            "prompt" => Ok(Command::Prompt((!rest.is_empty()).then(|| rest.to_string()))),
            "history" => Ok(Command::History),
            "stats" => Ok(Command::Stats),
            "export" => Ok(Command::Export),
            "clear" => match rest {
                "chat" => Ok(Command::ClearChat),
                "search" => Ok(Command::ClearSearch),
                _ => Err("Usage: clear chat|search".to_string()),
            },
            "lesson" => required("topic").map(Command::Lesson),
            "mcq" => parse_mcq(rest),
            "quit" | "exit" => Ok(Command::Quit),
            "" => Err("Type 'help' for a list of commands".to_string()),
            other => Err(format!("Unknown command '{}'. Type 'help' for a list of commands", other)),
        }
    }
}

fn parse_search(rest: &str) -> Result<Command, String> {
    let usage = || "Usage: search [-n N] <query>".to_string();
    let (first, after) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let (max_results, query) = match first.strip_prefix("-n") {
        Some("") => {
            let after = after.trim_start();
            let (n, query) = after.split_once(char::is_whitespace).unwrap_or((after, ""));
            if n.is_empty() {
                return Err(usage());
            }
            let n = n
                .parse::<u32>()
                .map_err(|_| format!("Invalid result count '{}'", n))?;
            (Some(n), query.trim())
        }
        // `-n5` glued to its count; anything else after `-n` is part of the query
        Some(count) if count.bytes().all(|b| b.is_ascii_digit()) => {
            return Err(format!("Separate the count from the flag: search -n {} <query>", count));
        }
        _ => (None, rest),
    };
    if query.is_empty() {
        return Err(usage());
    }
    Ok(Command::Search {
        query: query.to_string(),
        max_results,
    })
}

fn parse_mcq(rest: &str) -> Result<Command, String> {
    let usage = || "Usage: mcq <count> <topic>".to_string();
    let (count, topic) = rest.split_once(char::is_whitespace).ok_or_else(usage)?;
    let count = count.parse::<u32>().map_err(|_| usage())?;
    Ok(Command::Mcq {
        topic: topic.trim().to_string(),
        count,
    })
}

/// Runs a command and renders its output for the console.
pub async fn execute(state: &AppState, command: Command) -> Result<String, String> {
    match command {
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => Ok(String::new()),
        Command::Health => health(state).await,
        Command::Status => Ok(status(state).await),
        Command::Search { query, max_results } => search(state, &query, max_results).await,
        Command::Filter(category) => Ok(filter(state, category).await),
        Command::Chat(message) => chat(state, &message).await,
        Command::SimpleChat(message) => simple_chat(state, &message).await,
        Command::Prompt(prompt) => Ok(system_prompt(state, prompt).await),
        Command::History => Ok(history(state).await),
        Command::Stats => Ok(stats(state).await),
        Command::Export => export(state).await,
        Command::ClearChat => {
            log::warn!("Console requested to clear chat history");
            state.chat.lock().await.clear().await;
            Ok("Chat history cleared.".to_string())
        }
        Command::ClearSearch => {
            log::warn!("Console requested to clear search history");
            state.search.lock().await.clear_history().await;
            Ok("Search history cleared.".to_string())
        }
        Command::Lesson(topic) => lesson(state, topic).await,
        Command::Mcq { topic, count } => mcq(state, topic, count).await,
    }
}

async fn health(state: &AppState) -> Result<String, String> {
    log::info!("Console requested a health check");
    match state.api.check_health().await {
        Ok(health) => Ok(format!(
            "Connected: {} | {} FAQ records | {} ({})",
            health.status, health.faq_records, health.model, health.provider
        )),
        Err(e) => Err(format!("Backend connection error: {}", e)),
    }
}

async fn status(state: &AppState) -> String {
    let status = state.monitor.status().await;
    let mut out = String::from(if status.connected { "Connected" } else { "Disconnected" });
    if let Some(health) = &status.last_health {
        let _ = write!(out, " | {} FAQ records | {}", health.faq_records, health.model);
    }
    if let Some(error) = &status.last_error {
        let _ = write!(out, "\nLast error: {}", error);
    }
    if let Some(checked_at) = &status.checked_at {
        let _ = write!(out, "\nChecked: {}", format_timestamp(checked_at));
    }
    out
}

async fn search(state: &AppState, query: &str, max_results: Option<u32>) -> Result<String, String> {
    let max_results = max_results.unwrap_or(state.config.default_max_results);
    log::info!("Console requested FAQ search: {}", query);
    let mut session = state.search.lock().await;
    session
        .search(query, max_results)
        .await
        .map_err(|e| format!("Search failed: {}", e))?;

    let results = session.filtered_results();
    if results.is_empty() {
        return Ok(format!("No results found for '{}'.", query));
    }
    let mut out = format!("Search Results ({})\n", results.len());
    for result in results {
        let band = match result.similarity_band() {
            SimilarityBand::High => "high",
            SimilarityBand::Medium => "medium",
            SimilarityBand::Low => "low",
        };
        let _ = writeln!(
            out,
            "- {} [{} / {}] similarity {:.1}% ({})\n  {}",
            result.metadata.title,
            result.metadata.category,
            result.metadata.sub_category,
            result.similarity_score * 100.0,
            band,
            result.content
        );
    }
    let _ = write!(out, "Categories: {}", session.categories().join(", "));
    Ok(out)
}

async fn filter(state: &AppState, category: String) -> String {
    let mut session = state.search.lock().await;
    session.select_category(category);
    let results = session.filtered_results();
    let mut out = format!("{} result(s) in '{}'", results.len(), session.selected_category());
    for result in results {
        let _ = write!(out, "\n- {}", result.metadata.title);
    }
    out
}

async fn chat(state: &AppState, message: &str) -> Result<String, String> {
    log::info!("Console requested chat ({} chars)", message.len());
    let mut session = state.chat.lock().await;
    let reply = session
        .send(message)
        .await
        .ok_or_else(|| "Message must not be empty".to_string())?;

    let mut out = reply.content.clone();
    if let Some(context) = &reply.faq_context {
        let _ = write!(out, "\n[FAQ context] {}", context);
    }
    if let Some(usage) = &reply.usage {
        let _ = write!(
            out,
            "\nTokens: {} ({} prompt + {} completion)",
            usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
        );
    }
    Ok(out)
}

async fn simple_chat(state: &AppState, message: &str) -> Result<String, String> {
    log::info!("Console requested simple chat ({} chars)", message.len());
    state
        .api
        .simple_chat(message)
        .await
        .map(|response| response.response)
        .map_err(|e| format!("Error: {}", e))
}

async fn system_prompt(state: &AppState, prompt: Option<String>) -> String {
    let mut session = state.chat.lock().await;
    match prompt {
        Some(prompt) => {
            log::info!("Console updated the system prompt");
            session.set_system_prompt(prompt);
            "System prompt updated.".to_string()
        }
        None => format!("System prompt: {}", session.system_prompt()),
    }
}

async fn history(state: &AppState) -> String {
    let chat = state.history.load_chat_history().await;
    let session = state.search.lock().await;
    let searches = session.recent_searches();
    let mut out = format!("{} chat message(s) stored\n", chat.len());
    if let Some(error) = session.error() {
        let _ = writeln!(out, "Last search failed: {}", error);
    }
    if searches.is_empty() {
        out.push_str("No recent searches.");
    } else {
        out.push_str("Recent searches:");
        for item in searches.iter().take(5) {
            let _ = write!(
                out,
                "\n- {} ({} results, {})",
                item.query,
                item.result_count,
                format_timestamp(&item.timestamp)
            );
        }
    }
    out
}

async fn stats(state: &AppState) -> String {
    let chat = state.history.load_chat_history().await;
    let searches = state.history.load_search_history().await;
    let stats = UsageStats::compute(&chat, &searches);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Chat: {} user / {} assistant messages, {} tokens, {} FAQ-enhanced",
        stats.user_messages, stats.assistant_messages, stats.total_tokens, stats.faq_enhanced_responses
    );
    let _ = writeln!(
        out,
        "Search: {} searches, {} unique, {} results ({:.1} avg)",
        stats.total_searches, stats.unique_queries, stats.total_results, stats.average_results
    );
    let _ = write!(
        out,
        "FAQ usage {:.1}% | search success {:.1}% | {:.0} tokens per response",
        stats.faq_usage_rate, stats.search_success_rate, stats.average_tokens_per_response
    );

    let activity = recent_activity(&chat, &searches, RECENT_ACTIVITY_LIMIT);
    if !activity.is_empty() {
        out.push_str("\nRecent activity:");
    }
    for item in activity {
        let kind = match item.kind {
            ActivityKind::Chat(Role::User) => "user",
            ActivityKind::Chat(Role::Assistant) => "assistant",
            ActivityKind::Search => "search",
        };
        let _ = write!(out, "\n- [{}] {} {}", kind, format_timestamp(&item.timestamp), item.content);
        if let Some(extra) = item.extra {
            let _ = write!(out, " ({})", extra);
        }
    }
    out
}

async fn export(state: &AppState) -> Result<String, String> {
    log::info!("Console requested a data export");
    let bundle = state.history.export().await;
    let json = bundle
        .to_json()
        .map_err(|e| format!("Failed to serialize export: {}", e))?;
    let path = state.config.data_dir.join(bundle.file_name());
    tokio::fs::create_dir_all(&state.config.data_dir)
        .await
        .map_err(|e| format!("Failed to create {}: {}", state.config.data_dir.display(), e))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(format!("Exported data to {}", path.display()))
}

async fn lesson(state: &AppState, topic: String) -> Result<String, String> {
    log::info!("Console requested a course lesson on '{}'", topic);
    state
        .api
        .generate_course_lesson(&LessonRequest::new(topic))
        .await
        .map(|lesson| lesson.lesson_content)
        .map_err(|e| format!("Error: {}", e))
}

async fn mcq(state: &AppState, topic: String, count: u32) -> Result<String, String> {
    log::info!("Console requested {} MCQs on '{}'", count, topic);
    let response = state
        .api
        .generate_mcq(&McqRequest::new(topic, count))
        .await
        .map_err(|e| format!("Error: {}", e))?;

    let mut out = format!("{} Questions on \"{}\"", response.total_questions, response.topic);
    for (index, question) in response.questions.iter().enumerate() {
        let _ = write!(out, "\nQuestion {}: {}", index + 1, question.question);
        for option in &question.options {
            let marker = if *option == question.correct_answer { " (correct)" } else { "" };
            let _ = write!(out, "\n  - {}{}", option, marker);
        }
    }
    Ok(out)
}
