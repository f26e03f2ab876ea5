// orchestrator.rs - Quote Search Orchestration
// Runs one vv quote command invocation end to end: cooldown, argument
// parsing, endpoint selection, fetch, and delivery with forward-to-plain
// degradation. Every failure ends in a short chat notice.

use log::{debug, error, info};
use thiserror::Error;

use crate::api::{FetchError, SearchClient, SearchQuery, DEFAULT_API_URL};
use crate::config::VvQuestConfig;
use crate::cooldown::Cooldown;
use crate::present::{
    build_forward_nodes, build_plain_message, ChatSink, ForwardTarget, OutgoingMessage,
};
use crate::query::parse_arguments;

#[derive(Debug, Error)]
pub enum VvQuestError {
    #[error("rate limited, {remaining_secs}s remaining")]
    RateLimited { remaining_secs: u64 },
    #[error("empty search title")]
    EmptyQuery,
    #[error("search API request failed: {0}")]
    Transport(reqwest::Error),
    #[error("search API error: {}", .msg.as_deref().unwrap_or("no message"))]
    Api { msg: Option<String> },
    #[error("no matching images")]
    EmptyResult,
    #[error("forward message delivery failed: {0}")]
    ForwardDeliveryFailed(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<FetchError> for VvQuestError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Http(e) => VvQuestError::Transport(e),
            FetchError::Api { msg, .. } => VvQuestError::Api { msg },
            FetchError::Decode(e) => VvQuestError::Unexpected(e.to_string()),
        }
    }
}

impl VvQuestError {
    /// Chat text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            VvQuestError::RateLimited { remaining_secs } => {
                format!("⏳ 请求过于频繁，请等待 {} 秒后再试", remaining_secs)
            }
            VvQuestError::EmptyQuery => "⚠️ 搜索内容不能为空！".to_string(),
            VvQuestError::Transport(_) => "⏳ 请求超时，请稍后再试".to_string(),
            VvQuestError::Api { msg } => {
                format!("❌ 接口错误：{}", msg.as_deref().unwrap_or("未知错误"))
            }
            VvQuestError::EmptyResult => "🔍 未找到相关语录图片".to_string(),
            VvQuestError::ForwardDeliveryFailed(_) | VvQuestError::Unexpected(_) => {
                "❌ 发生意外错误，请联系管理员".to_string()
            }
        }
    }

    /// Failures caused by the service rather than by the user's input
    fn is_service_failure(&self) -> bool {
        matches!(
            self,
            VvQuestError::Transport(_)
                | VvQuestError::Api { .. }
                | VvQuestError::ForwardDeliveryFailed(_)
                | VvQuestError::Unexpected(_)
        )
    }
}

/// Platform-neutral view of one command call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Plain text of the replied-to message, if the command was a reply
    pub reply_text: Option<String>,
    pub args: String,
    pub conversation: ForwardTarget,
    /// The bot's own user id, used as speaker of forwarded nodes
    pub self_id: u64,
}

/// What an invocation ended with
#[derive(Debug)]
pub enum Outcome {
    /// Terminated with a notice (`VvQuestError::user_message`)
    Rejected(VvQuestError),
    Plain(OutgoingMessage),
    Forwarded { nodes: usize },
}

pub struct QueryOrchestrator {
    config: VvQuestConfig,
    cooldown: Cooldown,
    client: SearchClient,
    default_endpoint: String,
}

impl QueryOrchestrator {
    pub fn new(config: VvQuestConfig) -> Result<Self, reqwest::Error> {
        let client = SearchClient::new(config.retry_times, config.retry_delay)?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: VvQuestConfig, client: SearchClient) -> Self {
        Self {
            cooldown: Cooldown::new(config.cooldown),
            config,
            client,
            default_endpoint: DEFAULT_API_URL.to_string(),
        }
    }

    /// Replace the public endpoint used when `api_base` is empty and as fallback
    pub fn with_default_endpoint(mut self, url: impl Into<String>) -> Self {
        self.default_endpoint = url.into();
        self
    }

    pub fn config(&self) -> &VvQuestConfig {
        &self.config
    }

    /// Primary endpoint and, for a custom `api_base`, the fallback
    pub fn endpoints(&self) -> (&str, Option<&str>) {
        if self.config.has_custom_api() {
            (self.config.api_base.as_str(), Some(self.default_endpoint.as_str()))
        } else {
            (self.default_endpoint.as_str(), None)
        }
    }

    /// Run one invocation and deliver its result or notice through `sink`.
    /// Never fails: sink errors on the terminal message are only logged.
    pub async fn handle(&self, invocation: &Invocation, sink: &dyn ChatSink) -> Outcome {
        debug!(
            "vvquest config: max_num={}, use_forward={}, api_base={:?}, cooldown={:?}",
            self.config.max_num, self.config.use_forward, self.config.api_base, self.config.cooldown
        );

        match self.run(invocation, sink).await {
            Ok(Outcome::Plain(message)) => {
                if let Err(e) = sink.send_message(&message).await {
                    error!("❌ Failed to send quote images: {}", e);
                }
                Outcome::Plain(message)
            }
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_service_failure() {
                    error!("❌ vv quote request failed | {}", err);
                } else {
                    info!("vv quote request rejected: {}", err);
                }
                if let Err(e) = sink.send_text(&err.user_message()).await {
                    error!("❌ Failed to send notice: {}", e);
                }
                Outcome::Rejected(err)
            }
        }
    }

    async fn run(&self, invocation: &Invocation, sink: &dyn ChatSink) -> Result<Outcome, VvQuestError> {
        if let Err(remaining) = self.cooldown.try_acquire() {
            return Err(VvQuestError::RateLimited {
                remaining_secs: remaining.as_secs(),
            });
        }

        let parsed = parse_arguments(invocation.reply_text.as_deref(), &invocation.args);
        if parsed.title.is_empty() {
            return Err(VvQuestError::EmptyQuery);
        }

        let query = SearchQuery {
            count: parsed.clamped_count(self.config.max_num),
            title: parsed.title,
        };
        let (url, fallback) = self.endpoints();
        let images = self.client.fetch(url, fallback, &query).await?.into_images();

        if images.is_empty() {
            return Err(VvQuestError::EmptyResult);
        }

        if self.config.use_forward && images.len() > 1 {
            let nodes = build_forward_nodes(&images, invocation.self_id);
            match sink.send_forward(invocation.conversation, &nodes).await {
                Ok(()) => return Ok(Outcome::Forwarded { nodes: nodes.len() }),
                Err(e) => {
                    let err = VvQuestError::ForwardDeliveryFailed(e.to_string());
                    error!("❌ {}, sending plain message instead", err);
                }
            }
        }

        Ok(Outcome::Plain(build_plain_message(&images)))
    }
}
