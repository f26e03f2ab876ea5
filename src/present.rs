// present.rs - Result Presentation
// Platform-neutral message model for search results and the sink trait the
// chat platform implements to deliver them.

use async_trait::async_trait;

/// Label prefix of each forwarded node
pub const NODE_LABEL: &str = "维维语录";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Image(String),
}

/// A single composite chat message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub segments: Vec<Segment>,
}

impl OutgoingMessage {
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                Segment::Image(_) => None,
            })
            .collect()
    }

    pub fn image_urls(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Image(url) => Some(url.as_str()),
                Segment::Text(_) => None,
            })
            .collect()
    }
}

/// One entry of a forwarded message group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardNode {
    pub name: String,
    pub speaker_id: u64,
    pub content: Vec<Segment>,
}

/// Where a forwarded group is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardTarget {
    /// Shared conversation (guild channel id)
    Group(u64),
    /// One-to-one conversation with a user
    Private(u64),
}

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Delivery side of the chat platform
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Short notice in reply to the invocation
    async fn send_text(&self, text: &str) -> Result<(), SinkError>;

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), SinkError>;

    async fn send_forward(&self, target: ForwardTarget, nodes: &[ForwardNode]) -> Result<(), SinkError>;
}

/// Result count line followed by every image, in order
pub fn build_plain_message(urls: &[String]) -> OutgoingMessage {
    let mut segments = Vec::with_capacity(urls.len() + 1);
    segments.push(Segment::Text(format!("找到 {} 条相关语录：\n", urls.len())));
    segments.extend(urls.iter().cloned().map(Segment::Image));
    OutgoingMessage { segments }
}

/// One node per image, labeled `维维语录 N` and attributed to `speaker_id`
pub fn build_forward_nodes(urls: &[String], speaker_id: u64) -> Vec<ForwardNode> {
    urls.iter()
        .enumerate()
        .map(|(idx, url)| ForwardNode {
            name: format!("{} {}", NODE_LABEL, idx + 1),
            speaker_id,
            content: vec![Segment::Image(url.clone())],
        })
        .collect()
}
