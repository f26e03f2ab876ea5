mod api;
mod commands;
mod config;
mod cooldown;
mod orchestrator;
mod present;
mod query;

use serenity::{
    async_trait,
    client::{Client, Context, EventHandler},
    framework::standard::{macros::group, StandardFramework},
    model::gateway::Ready,
    prelude::GatewayIntents,
    prelude::TypeMapKey,
};
use std::sync::Arc;
use tokio::signal;

use crate::config::{BotConfig, VvQuestConfig};
use crate::orchestrator::QueryOrchestrator;

// TypeMap key for the quote search orchestrator (config, cooldown, HTTP client)
pub struct VvQuestState;
impl TypeMapKey for VvQuestState {
    type Value = Arc<QueryOrchestrator>;
}

// TypeMap key for the configured command prefix, used in help output
pub struct BotPrefix;
impl TypeMapKey for BotPrefix {
    type Value = String;
}

// Import all command constants generated by the #[command] macro
use crate::commands::help::HELP_COMMAND;
use crate::commands::vvquote::VVQUOTE_COMMAND;

// Command group declaration - includes all available commands
#[group]
#[commands(vvquote, help)]
struct General;

// Event handler implementation
struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        log::info!("✅ Bot connected as {}! (ID: {})", ready.user.name, ready.user.id);
        println!("✅ Bot connected as {}!", ready.user.name);
    }
}

#[tokio::main]
async fn main() {
    // Initialize logger - must be done before any logging calls
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    // Load configuration from botconfig.txt file
    let config_map = match config::load_config_map() {
        Ok((map, source)) => {
            println!("✅ Configuration loaded from {}", source);
            map
        }
        Err(error) => {
            log::error!("❌ Failed to load botconfig.txt: {}", error);
            eprintln!("❌ Failed to load botconfig.txt: {}", error);
            eprintln!("Create a botconfig.txt file in the project root with: DISCORD_TOKEN=your_token_here and PREFIX=^");
            return;
        }
    };

    let bot_config = match BotConfig::from_map(&config_map) {
        Ok(bot_config) => bot_config,
        Err(error) => {
            log::error!("❌ {}", error);
            eprintln!("❌ {}! Replace it with your actual Discord bot token.", error);
            return;
        }
    };

    let vvquest_config = match VvQuestConfig::from_map(&config_map) {
        Ok(vvquest_config) => vvquest_config,
        Err(error) => {
            log::error!("❌ {}", error);
            eprintln!("❌ {}", error);
            return;
        }
    };
    log::debug!("🔧 VV quote settings: {:?}", vvquest_config);

    let orchestrator = match QueryOrchestrator::new(vvquest_config) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(error) => {
            log::error!("❌ Error creating HTTP client: {}", error);
            eprintln!("❌ Error creating HTTP client: {}", error);
            return;
        }
    };

    println!("🤖 Starting bot with prefix: '{}'", bot_config.prefix);

    // Set up command framework
    let framework = StandardFramework::new()
        .configure(|c| {
            c.prefix(&bot_config.prefix)
                .case_insensitivity(true)
                .no_dm_prefix(true)
                .with_whitespace(true)
        })
        .after(|_ctx, msg, command_name, result| {
            Box::pin(async move {
                if let Err(e) = result {
                    log::error!(
                        "❌ Command '{}' failed for user {} ({}): {:?}",
                        command_name,
                        msg.author.name,
                        msg.author.id,
                        e
                    );
                }
            })
        })
        .group(&GENERAL_GROUP);

    // Configure bot intents
    let intents = GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT;

    // Create and start client
    let mut client = match Client::builder(&bot_config.token, intents)
        .event_handler(Handler)
        .framework(framework)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Error creating Discord client: {:?}", e);
            eprintln!("❌ Error creating Discord client: {:?}", e);
            eprintln!("Check your token in botconfig.txt file");
            return;
        }
    };

    {
        let mut data = client.data.write().await;
        data.insert::<VvQuestState>(orchestrator);
        data.insert::<BotPrefix>(bot_config.prefix.clone());
    }

    // Set up graceful shutdown on CTRL+C
    println!("🚀 Bot is running... Press Ctrl+C to stop");
    tokio::select! {
        _ = signal::ctrl_c() => {
            println!("\n⏹️ Stopping bot gracefully...");
        }
        result = client.start() => {
            if let Err(why) = result {
                log::error!("❌ Client error: {:?}", why);
                eprintln!("❌ Client error: {:?}", why);
            }
        }
    }

    println!("✅ Bot stopped");
}
