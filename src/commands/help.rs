// help.rs - Help Command Module
// Explains how to search 维维语录 images with this bot

use serenity::{
    client::Context,
    framework::standard::{macros::command, CommandResult},
    model::channel::Message,
};

use crate::config::VvQuestConfig;

#[command]
#[aliases("h", "vvhelp")]
/// Display usage for the quote search command
pub async fn help(ctx: &Context, msg: &Message) -> CommandResult {
    let (prefix, config) = {
        let data = ctx.data.read().await;
        let prefix = data
            .get::<crate::BotPrefix>()
            .cloned()
            .unwrap_or_else(|| "^".to_string());
        let config = data
            .get::<crate::VvQuestState>()
            .map(|state| state.config().clone())
            .unwrap_or_default();
        (prefix, config)
    };

    msg.reply(ctx, help_text(&prefix, &config)).await?;
    Ok(())
}

pub fn help_text(prefix: &str, config: &VvQuestConfig) -> String {
    let api = if config.has_custom_api() {
        "自定义API（失败时回退在线API）"
    } else {
        "默认在线API"
    };

    format!(
        "**🔍 维维语录 - 通过API获取维维语录图片**\n\n\
        **使用方式：**\n\
        • `{p}vv语录 <标题> [数量]` - 直接搜索\n\
        • `{p}vv语录 <标题> n=<数量>` - 指定数量\n\
        • 引用某条消息 + `{p}vv语录 [数量]` - 用被引用的内容搜索\n\
        • **别名：** `{p}维维语录`\n\n\
        **当前设置：**\n\
        • 最多返回 {max} 张，默认 5 张\n\
        • 冷却时间 {cooldown} 秒\n\
        • 合并转发：{forward}\n\
        • 接口：{api}\n\n\
        **示例：**\n\
        • `{p}vv语录 泡芙 3` • `{p}维维语录 我是维维 n=8`",
        p = prefix,
        max = config.max_num,
        cooldown = config.cooldown.as_secs(),
        forward = if config.use_forward { "开启" } else { "关闭" },
        api = api,
    )
}
