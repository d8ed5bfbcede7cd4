mod config;
pub mod conversation;
pub mod credentials;
pub mod error;
pub mod pricing;

pub use config::{Config, GatewayConfig};
pub use conversation::{ConversationManager, ConversationSummary};
pub use credentials::{ApiKeyProvider, EnvApiKey};
pub use error::{LLMError, ToolError};
pub use pricing::{calculate_cost, ModelPricing, PricingCache, PricingSource, PricingTable};
