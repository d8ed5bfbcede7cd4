use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Your query to the LLM
    #[arg()]
    pub query: String,

    /// Model id to request from the gateway
    #[arg(short, long)]
    pub model: Option<String>,

    /// Enable tool usage
    #[arg(long)]
    pub enable_tools: Option<bool>,

    /// Maximum number of tool execution steps
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Print reasoning text as it streams
    #[arg(short, long)]
    pub reasoning: bool,

    /// Fetch current model prices from the gateway before querying
    #[arg(long)]
    pub refresh_pricing: bool,

    /// Enable debug output
    #[arg(short, long, default_value = "false")]
    pub debug: bool,
}
