use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use aurora_backend_client::ApiError;
use aurora_backend_client::BackendOrchestrator;
use aurora_backend_client::DEFAULT_SEARCH_LIMIT;
use aurora_protocol::ChatMessage;
use aurora_protocol::CodeImprovement;
use aurora_protocol::ImpactAssessment;
use aurora_protocol::PageAnalysis;
use aurora_protocol::SearchResponse;
use chrono::SecondsFormat;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::response_parser::ParseError;
use crate::response_parser::extract_structured;

const MAX_PAGE_CHARS: usize = 8_000;

const PAGE_ANALYSIS_PROMPT: &str = r#"You are Aurora, an AI assistant integrated into a web browser. Analyze the following webpage content and provide:
1. A concise summary (2-3 sentences)
2. Key topics or entities mentioned
3. Any actionable insights
4. Potential follow-up questions the user might have

Format your response as JSON with the following structure:
{
    "summary": "Brief summary of the page",
    "topics": ["Topic 1", "Topic 2", "Topic 3"],
    "insights": ["Insight 1", "Insight 2"],
    "questions": ["Question 1?", "Question 2?"]
}
"#;

const CODE_IMPROVEMENT_PROMPT: &str = r#"You are Aurora, an AI assistant that can suggest improvements to browser code. Analyze the following code and provide:
1. Improved version of the code
2. Explanation of changes
3. Impact assessment (performance, security, user experience)

Format your response as JSON with the following structure:
{
    "improvedCode": "// Your improved code here",
    "explanation": "Explanation of changes",
    "impact": {
        "performance": 0.5,
        "security": 0.2,
        "userExperience": 0.8
    }
}
Impact values range from -1.0 to 1.0."#;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Deserialize)]
struct PageAnalysisPayload {
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CodeImprovementPayload {
    improved_code: String,
    explanation: String,
    #[serde(default)]
    impact: ImpactPayload,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpactPayload {
    #[serde(default)]
    performance: f64,
    #[serde(default)]
    security: f64,
    #[serde(default)]
    user_experience: f64,
}

/// Page analysis, code suggestions, indexing and search on top of the
/// [`BackendOrchestrator`]. Remembers the last failure for display and keeps
/// the log of answered questions.
#[derive(Debug)]
pub struct AssistantService {
    orchestrator: Arc<BackendOrchestrator>,
    last_error: Mutex<Option<String>>,
    conversation: Mutex<Vec<ChatMessage>>,
}

impl AssistantService {
    pub fn new(orchestrator: Arc<BackendOrchestrator>) -> Self {
        Self {
            orchestrator,
            last_error: Mutex::new(None),
            conversation: Mutex::new(Vec::new()),
        }
    }

    pub fn orchestrator(&self) -> &Arc<BackendOrchestrator> {
        &self.orchestrator
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    fn track<T, E: std::fmt::Display>(&self, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.set_last_error(None),
            Err(err) => self.set_last_error(Some(err.to_string())),
        }
        result
    }

    /// Questions and answers from [`Self::answer`], oldest first.
    pub fn conversation(&self) -> Vec<ChatMessage> {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_conversation(&self) {
        self.conversation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Plain chat answer, optionally grounded in page `context`. Only
    /// successful exchanges are appended to the conversation.
    pub async fn answer(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<String, AssistantError> {
        let question = ChatMessage::user(prompt);
        let result = self
            .orchestrator
            .chat(std::slice::from_ref(&question), context)
            .await
            .map_err(AssistantError::from);
        if let Ok(reply) = &result {
            let mut conversation = self
                .conversation
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            conversation.push(question);
            conversation.push(ChatMessage::assistant(reply.clone()));
        }
        self.track(result)
    }

    pub async fn analyze_page(
        &self,
        content: &str,
        url: &Url,
    ) -> Result<PageAnalysis, AssistantError> {
        let result = self.analyze_page_inner(content, url).await;
        self.track(result)
    }

    async fn analyze_page_inner(
        &self,
        content: &str,
        url: &Url,
    ) -> Result<PageAnalysis, AssistantError> {
        let messages = [
            ChatMessage::system(format!("{PAGE_ANALYSIS_PROMPT}\nWebpage: {url}")),
            ChatMessage::user(truncate_page(content)),
        ];
        let raw = self.orchestrator.complete(&messages).await?;
        let payload: PageAnalysisPayload = extract_structured(&raw).inspect_err(|err| {
            warn!(%url, "page analysis response rejected: {err}");
        })?;
        Ok(PageAnalysis {
            url: url.clone(),
            summary: payload.summary,
            topics: payload.topics,
            insights: payload.insights,
            suggested_questions: payload.questions,
            timestamp: Utc::now(),
        })
    }

    pub async fn suggest_code_improvements(
        &self,
        code: &str,
        description: &str,
    ) -> Result<CodeImprovement, AssistantError> {
        let result = self.suggest_code_improvements_inner(code, description).await;
        self.track(result)
    }

    async fn suggest_code_improvements_inner(
        &self,
        code: &str,
        description: &str,
    ) -> Result<CodeImprovement, AssistantError> {
        let messages = [
            ChatMessage::system(CODE_IMPROVEMENT_PROMPT),
            ChatMessage::user(format!(
                "Code description: {description}\n\nCode:\n```\n{code}\n```"
            )),
        ];
        let raw = self.orchestrator.complete(&messages).await?;
        let payload: CodeImprovementPayload = extract_structured(&raw).inspect_err(|err| {
            warn!("code improvement response rejected: {err}");
        })?;
        let impact = ImpactAssessment {
            performance: payload.impact.performance,
            security: payload.impact.security,
            user_experience: payload.impact.user_experience,
        }
        .clamped();
        Ok(CodeImprovement {
            original_code: code.to_string(),
            improved_code: payload.improved_code,
            explanation: payload.explanation,
            performance_impact: impact.performance,
            security_impact: impact.security,
            user_experience_impact: impact.user_experience,
            timestamp: Utc::now(),
        })
    }

    /// Stores the page in the backend's search index. `false` on any
    /// failure, including a disconnected backend.
    pub async fn index_webpage(&self, title: &str, content: &str, url: &Url) -> bool {
        let metadata = HashMap::from([
            ("title".to_string(), title.to_string()),
            ("url".to_string(), url.to_string()),
            (
                "indexed_at".to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ]);
        match self.orchestrator.index(content, Some(&metadata)).await {
            Ok(indexed) => {
                if indexed {
                    self.set_last_error(None);
                } else {
                    self.set_last_error(Some(format!("failed to index {url}")));
                }
                indexed
            }
            Err(err) => {
                warn!(%url, "indexing skipped: {err}");
                self.set_last_error(Some(err.to_string()));
                false
            }
        }
    }

    pub async fn search_content(&self, query: &str) -> Result<SearchResponse, AssistantError> {
        self.search_content_with_limit(query, DEFAULT_SEARCH_LIMIT).await
    }

    pub async fn search_content_with_limit(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<SearchResponse, AssistantError> {
        let result = self
            .orchestrator
            .search(query, limit)
            .await
            .map_err(AssistantError::from);
        self.track(result)
    }
}

/// At most [`MAX_PAGE_CHARS`] characters, with `...` appended when cut.
fn truncate_page(content: &str) -> String {
    match content.char_indices().nth(MAX_PAGE_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_pages_are_sent_whole() {
        assert_eq!(truncate_page("hello"), "hello");
        let exact = "a".repeat(MAX_PAGE_CHARS);
        assert_eq!(truncate_page(&exact), exact);
    }

    #[test]
    fn long_pages_are_cut_on_char_boundaries() {
        let page = "é".repeat(MAX_PAGE_CHARS + 10);
        let truncated = truncate_page(&page);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), MAX_PAGE_CHARS + 3);
    }

    #[test]
    fn impact_defaults_to_zero_when_omitted() {
        let payload: CodeImprovementPayload =
            extract_structured(r#"{"improvedCode": "x", "explanation": "y"}"#).unwrap();
        assert_eq!(payload.impact.performance, 0.0);
        assert_eq!(payload.impact.user_experience, 0.0);
    }
}
