// vvquote.rs - VV Quote Search Command Module
// This module implements the ^vv语录 command (alias ^维维语录), which searches
// 维维语录 images by phrase and posts them back to the channel.
//
// Key Features:
// - Search by arguments or by replying to a message
// - Optional count via `n=<num>` or a bare number
// - Multiple results are grouped as forwarded quote embeds, with plain fallback
//
// Used by: main.rs (command registration)

// ============================================================================
// IMPORTS
// ============================================================================

use async_trait::async_trait;
use serenity::{
    client::Context,
    framework::standard::{macros::command, Args, CommandResult},
    model::{
        channel::Message,
        id::{ChannelId, UserId},
    },
};

use crate::orchestrator::{Invocation, Outcome};
use crate::present::{ChatSink, ForwardNode, ForwardTarget, OutgoingMessage, Segment, SinkError};

/// Discord rejects messages carrying more embeds than this
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

#[command("vv语录")]
#[aliases("维维语录")]
/// Main ^vv语录 command handler
/// Supports:
///   - ^vv语录 <title> [count | n=<count>]
///   - reply to a message with ^vv语录 [count | n=<count>]
pub async fn vvquote(ctx: &Context, msg: &Message, args: Args) -> CommandResult {
    let _typing = ctx.http.start_typing(msg.channel_id.0)?;

    let orchestrator = {
        let data = ctx.data.read().await;
        data.get::<crate::VvQuestState>().cloned()
    };
    let orchestrator = match orchestrator {
        Some(orchestrator) => orchestrator,
        None => {
            log::error!("[VVQUOTE] Search state missing from client data");
            msg.reply(ctx, "❌ 发生意外错误，请联系管理员").await?;
            return Ok(());
        }
    };

    let current_user = ctx.cache.current_user();
    let invocation = Invocation {
        reply_text: msg.referenced_message.as_ref().map(|r| r.content.clone()),
        args: args.rest().to_string(),
        conversation: conversation_of(msg),
        self_id: current_user.id.0,
    };

    log::info!(
        "[VVQUOTE] {} ({}) searching: '{}' (reply: {})",
        msg.author.name,
        msg.author.id,
        invocation.args,
        invocation.reply_text.is_some()
    );

    let sink = DiscordSink {
        ctx,
        msg,
        bot_name: current_user.name.clone(),
        bot_avatar: current_user.avatar_url(),
    };

    match orchestrator.handle(&invocation, &sink).await {
        Outcome::Forwarded { nodes } => log::info!("[VVQUOTE] Forwarded {} quotes", nodes),
        Outcome::Plain(message) => {
            log::info!("[VVQUOTE] Sent {} quotes", message.image_urls().len())
        }
        Outcome::Rejected(err) => log::debug!("[VVQUOTE] Finished with notice: {}", err),
    }

    Ok(())
}

/// Guild channels are group conversations; anything else is a DM with the author
fn conversation_of(msg: &Message) -> ForwardTarget {
    if msg.guild_id.is_some() {
        ForwardTarget::Group(msg.channel_id.0)
    } else {
        ForwardTarget::Private(msg.author.id.0)
    }
}

// ============================================================================
// DISCORD DELIVERY
// ============================================================================

/// One Discord message worth of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedBatch {
    pub content: Option<String>,
    pub images: Vec<String>,
}

/// Split a composite message into Discord messages of at most
/// `MAX_EMBEDS_PER_MESSAGE` image embeds, text on the first one.
pub fn plan_batches(message: &OutgoingMessage) -> Vec<EmbedBatch> {
    let text = message.text();
    let content = if text.trim().is_empty() { None } else { Some(text) };
    let urls = message.image_urls();

    if urls.is_empty() {
        return vec![EmbedBatch {
            content,
            images: Vec::new(),
        }];
    }

    let mut content = content;
    urls.chunks(MAX_EMBEDS_PER_MESSAGE)
        .map(|chunk| EmbedBatch {
            content: content.take(),
            images: chunk.iter().map(|u| u.to_string()).collect(),
        })
        .collect()
}

fn node_image(node: &ForwardNode) -> Option<&str> {
    node.content.iter().find_map(|segment| match segment {
        Segment::Image(url) => Some(url.as_str()),
        Segment::Text(_) => None,
    })
}

struct DiscordSink<'a> {
    ctx: &'a Context,
    msg: &'a Message,
    bot_name: String,
    bot_avatar: Option<String>,
}

#[async_trait]
impl<'a> ChatSink for DiscordSink<'a> {
    async fn send_text(&self, text: &str) -> Result<(), SinkError> {
        self.msg.reply(self.ctx, text).await?;
        Ok(())
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), SinkError> {
        for (index, batch) in plan_batches(message).iter().enumerate() {
            self.msg
                .channel_id
                .send_message(&self.ctx.http, |m| {
                    if index == 0 {
                        m.reference_message(self.msg);
                    }
                    if let Some(content) = &batch.content {
                        m.content(content);
                    }
                    for url in &batch.images {
                        m.add_embed(|e| e.image(url));
                    }
                    m
                })
                .await?;
        }
        Ok(())
    }

    async fn send_forward(&self, target: ForwardTarget, nodes: &[ForwardNode]) -> Result<(), SinkError> {
        let channel_id = match target {
            ForwardTarget::Group(channel_id) => ChannelId(channel_id),
            ForwardTarget::Private(user_id) => UserId(user_id).create_dm_channel(self.ctx).await?.id,
        };

        for chunk in nodes.chunks(MAX_EMBEDS_PER_MESSAGE) {
            channel_id
                .send_message(&self.ctx.http, |m| {
                    for node in chunk {
                        m.add_embed(|e| {
                            e.title(&node.name);
                            e.author(|a| {
                                a.name(&self.bot_name);
                                if let Some(avatar) = &self.bot_avatar {
                                    a.icon_url(avatar);
                                }
                                a
                            });
                            if let Some(url) = node_image(node) {
                                e.image(url);
                            }
                            e
                        });
                    }
                    m
                })
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::{build_forward_nodes, build_plain_message};

    fn urls(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://img.example/{i}.png")).collect()
    }

    #[test]
    fn small_result_fits_one_message() {
        let batches = plan_batches(&build_plain_message(&urls(3)));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].content.as_deref(), Some("找到 3 条相关语录：\n"));
        assert_eq!(batches[0].images, urls(3));
    }

    #[test]
    fn large_result_is_split_with_text_first() {
        let batches = plan_batches(&build_plain_message(&urls(23)));
        assert_eq!(batches.len(), 3);
        assert!(batches[0].content.is_some());
        assert!(batches[1].content.is_none());
        assert_eq!(
            batches.iter().map(|b| b.images.len()).collect::<Vec<_>>(),
            vec![10, 10, 3]
        );
        let flattened: Vec<String> = batches.into_iter().flat_map(|b| b.images).collect();
        assert_eq!(flattened, urls(23));
    }

    #[test]
    fn text_only_message_is_one_batch() {
        let message = OutgoingMessage {
            segments: vec![Segment::Text("hi".to_string())],
        };
        assert_eq!(
            plan_batches(&message),
            vec![EmbedBatch {
                content: Some("hi".to_string()),
                images: vec![]
            }]
        );
    }

    #[test]
    fn forward_node_image_is_extracted() {
        let nodes = build_forward_nodes(&urls(2), 1);
        assert_eq!(node_image(&nodes[1]), Some("https://img.example/2.png"));
    }
}
