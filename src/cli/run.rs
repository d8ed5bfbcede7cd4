use colored::Colorize;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::args::Args;
use crate::{
    core::{Config, ConversationManager, ConversationSummary, LLMError},
    providers::{Message, OpenRouterClient},
    tools::{DateTimeTool, ToolExecutor, ToolRegistry},
};
use std::io::{self, Write};
use std::sync::Arc;

fn create_tool_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(DateTimeTool);
    registry
}

fn initial_messages(config: &Config, query: String) -> Vec<Message> {
    config
        .system_prompt
        .iter()
        .filter(|prompt| !prompt.trim().is_empty())
        .map(Message::system)
        .chain(std::iter::once(Message::user(query)))
        .collect()
}

/// Cancels `token` on the first Ctrl-C
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("[CLI] interrupt received, cancelling");
            token.cancel();
        }
    });
}

fn print_summary(summary: &ConversationSummary) {
    let usage = &summary.usage;
    let line = format!(
        "[{} prompt + {} completion = {} tokens, ${:.6}]",
        usage.prompt_tokens, usage.completion_tokens, usage.total_tokens, summary.cost
    );
    eprintln!("{}", line.dimmed());
    if summary.cancelled {
        eprintln!("{}", "[cancelled]".yellow());
    }
}

pub async fn run(args: Args) -> Result<(), LLMError> {
    let _ = dotenv::dotenv();

    let query = args.query;
    if query.trim().is_empty() {
        return Err(LLMError::ConfigError("Query must not be empty".to_string()));
    }
    let mut config = Config::load()?;
    let enable_tools = args.enable_tools.unwrap_or(config.enable_tools);
    let max_steps = args.max_steps.unwrap_or(config.max_steps);

    if let Some(model) = args.model {
        config.update_model(model);
    }

    debug!(
        "[SETTINGS] model: {}, tool_enabled: {enable_tools}, max_steps: {max_steps}",
        config.get_model()
    );

    let messages = initial_messages(&config, query);
    let tool_ids = config.tools.clone();
    let client = OpenRouterClient::from_config(config);

    if args.refresh_pricing {
        let pricing = Arc::clone(client.pricing());
        match pricing.refresh(&client).await {
            Ok(count) => debug!("[Pricing] loaded prices for {count} models"),
            Err(e) => warn!("[Pricing] refresh failed, using configured prices: {e}"),
        }
    }

    let registry = enable_tools.then(|| Box::new(create_tool_registry()) as Box<dyn ToolExecutor>);
    let mut conversation_manager = ConversationManager::new(Box::new(client), registry, tool_ids)
        .with_reasoning(args.reasoning);

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let mut stdout = io::stdout();
    let summary = conversation_manager
        .run(messages, max_steps, &mut stdout, &cancel)
        .await?;

    // Ensure final newline
    writeln!(&mut stdout)?;
    print_summary(&summary);
    Ok(())
}
