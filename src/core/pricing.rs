use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;

use crate::core::LLMError;
use crate::providers::Usage;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Rates in USD per one million tokens
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

pub type PricingTable = HashMap<String, ModelPricing>;

/// Computes the spend for one completion.
///
/// Unknown models cost nothing; this is logged and never an error.
pub fn calculate_cost(model: &str, usage: &Usage, table: &PricingTable) -> f64 {
    let Some(pricing) = table.get(model) else {
        warn!("[Pricing] no pricing for model '{model}', reporting zero cost");
        return 0.0;
    };

    f64::from(usage.prompt_tokens) / TOKENS_PER_UNIT * pricing.input
        + f64::from(usage.completion_tokens) / TOKENS_PER_UNIT * pricing.output
}

/// Somewhere a fresh pricing table can be fetched from
#[async_trait]
pub trait PricingSource: Send + Sync {
    async fn fetch_pricing(&self) -> Result<PricingTable, LLMError>;
}

/// Shared pricing table with an explicit refresh/invalidate lifecycle
#[derive(Debug, Default)]
pub struct PricingCache {
    seed: PricingTable,
    table: RwLock<Arc<PricingTable>>,
}

impl PricingCache {
    pub fn new(seed: PricingTable) -> Self {
        Self {
            table: RwLock::new(Arc::new(seed.clone())),
            seed,
        }
    }

    pub fn get(&self) -> Arc<PricingTable> {
        match self.table.read() {
            Ok(table) => Arc::clone(&table),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Merges freshly fetched rates over the seed table.
    ///
    /// On failure the current table is left untouched.
    pub async fn refresh(&self, source: &dyn PricingSource) -> Result<usize, LLMError> {
        let fetched = source.fetch_pricing().await?;
        let mut merged = self.seed.clone();
        merged.extend(fetched);
        let count = merged.len();
        debug!("[Pricing] refreshed table with {count} models");
        self.replace(merged);
        Ok(count)
    }

    /// Drops fetched rates and returns to the seed table
    pub fn invalidate(&self) {
        self.replace(self.seed.clone());
    }

    pub fn cost(&self, model: &str, usage: &Usage) -> f64 {
        calculate_cost(model, usage, &self.get())
    }

    fn replace(&self, table: PricingTable) {
        let table = Arc::new(table);
        match self.table.write() {
            Ok(mut guard) => *guard = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
    }
}
