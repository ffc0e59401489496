//! Echo Bot Example
//!
//! Demonstrates the basic teleforge flow: build a bot over the HTTP
//! transport, register a couple of handlers with middleware, and run the
//! long-polling dispatch loop until Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! BOT_TOKEN=123456:ABC-DEF cargo run --package echo-bot
//! ```

use std::sync::Arc;

use teleforge::prelude::*;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,teleforge_core=debug".into()),
        )
        .init();

    let token = std::env::var("BOT_TOKEN")
        .map_err(|_| ApiError::Other("BOT_TOKEN is not set".into()))?;

    let bot = Bot::builder(token)
        .transport(Arc::new(HttpTransport::new()?))
        .source(Arc::new(LongPoller::default()))
        .await_tasks_on_stop(true)
        .build()
        .await?;
    info!(username = %bot.me().username.unwrap_or_default(), "logged in");

    // Log every update that reaches a handler.
    bot.use_middleware(logger());

    bot.handle("/start", handler(|ctx: Context| async move {
        ctx.reply("Hi! Send me anything and I will echo it back.").await?;
        Ok(())
    }), vec![]);

    // Echo plain text, ignoring messages relayed through other bots.
    bot.handle(ON_TEXT, handler(|ctx: Context| async move {
        let text = ctx.text().to_string();
        ctx.send(text).await?;
        Ok(())
    }), vec![ignore_via()]);

    let stopper = bot.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            stopper.stop().await;
        }
    });

    bot.start().await
}
