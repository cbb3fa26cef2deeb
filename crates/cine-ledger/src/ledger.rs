//! Durable cost ledger.
//!
//! Tracks spend across providers with a running total and per-operation
//! buckets. The full state is persisted to a JSON file after every
//! mutation: persistence is unconditional and on the critical path of
//! each recorded operation, trading throughput for durability. A crash
//! therefore loses at most the record in flight.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use cine_models::{OperationKind, Provider};

use crate::error::{LedgerError, LedgerResult};
use crate::pricing;

/// Constant estimate of what one cloud analysis would have cost; used to
/// value cache hits in the savings report, not a measured figure.
const AVG_ANALYSIS_COST: f64 = 2.0;

/// Durable running totals.
///
/// `total_cost` is monotonically non-decreasing except on an explicit
/// [`CostLedger::reset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    total_cost: f64,
    /// Named buckets keyed `<operation>_<provider>`
    breakdown: BTreeMap<String, f64>,
    api_calls: u64,
    cache_hits: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<String>,
}

/// Aggregated cost report.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub total_cost: f64,
    pub breakdown: BTreeMap<String, f64>,
    pub api_calls: u64,
    pub cache_hits: u64,
    /// Percentage of all operations served from cache
    pub cache_hit_rate: f64,
    /// Estimated savings: `cache_hits x average analysis cost`
    pub costs_saved: f64,
    /// `total_cost - costs_saved`
    pub net_cost: f64,
}

/// Informational comparison against a spending ceiling. Never enforced.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub budget: f64,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub exceeded: bool,
}

/// Cost ledger with synchronous JSON persistence.
pub struct CostLedger {
    persist_path: PathBuf,
    state: Mutex<LedgerState>,
}

impl CostLedger {
    /// Open the ledger, loading prior state from `persist_path` when present.
    pub async fn open(persist_path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let persist_path = persist_path.into();

        if let Some(parent) = persist_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let state = match tokio::fs::read(&persist_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LedgerState::default(),
            Err(e) => return Err(LedgerError::Io(e)),
        };

        Ok(Self {
            persist_path,
            state: Mutex::new(state),
        })
    }

    /// Record a token-metered operation and return its computed cost.
    pub async fn record(
        &self,
        kind: OperationKind,
        provider: Provider,
        model: &str,
        tokens: u64,
    ) -> LedgerResult<f64> {
        let cost = match kind {
            OperationKind::ImageGeneration => pricing::image_generation_cost(model),
            _ => pricing::token_cost(provider, model, tokens),
        };

        let mut state = self.state.lock().await;
        state.total_cost += cost;
        state.api_calls += 1;

        let bucket = format!("{}_{}", kind, provider);
        *state.breakdown.entry(bucket.clone()).or_insert(0.0) += cost;

        self.persist(&mut state).await?;

        info!(
            operation = %kind,
            provider = %provider,
            model = %model,
            cost = format!("${:.4}", cost),
            "Recorded operation cost"
        );
        Ok(cost)
    }

    /// Record a cache hit (cost avoided, nothing billed).
    pub async fn record_cache_hit(&self, kind: OperationKind) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        state.cache_hits += 1;
        self.persist(&mut state).await?;
        debug!(operation = %kind, "Recorded cache hit");
        Ok(())
    }

    /// Aggregate report including estimated cache savings.
    pub async fn report(&self) -> CostReport {
        let state = self.state.lock().await;

        let total_operations = state.api_calls + state.cache_hits;
        let cache_hit_rate = if total_operations > 0 {
            state.cache_hits as f64 / total_operations as f64 * 100.0
        } else {
            0.0
        };

        let costs_saved = state.cache_hits as f64 * AVG_ANALYSIS_COST;

        CostReport {
            total_cost: state.total_cost,
            breakdown: state.breakdown.clone(),
            api_calls: state.api_calls,
            cache_hits: state.cache_hits,
            cache_hit_rate,
            costs_saved,
            net_cost: state.total_cost - costs_saved,
        }
    }

    /// Zero all totals and persist the empty state.
    pub async fn reset(&self) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        *state = LedgerState::default();
        self.persist(&mut state).await?;
        info!("Cost ledger reset");
        Ok(())
    }

    /// Compare accumulated spend against a budget ceiling.
    ///
    /// Purely informational: exceeding the budget never blocks a request.
    pub async fn budget_status(&self, budget: f64) -> BudgetStatus {
        let state = self.state.lock().await;
        let remaining = budget - state.total_cost;
        let percent_used = if budget > 0.0 {
            state.total_cost / budget * 100.0
        } else {
            0.0
        };

        BudgetStatus {
            budget,
            spent: state.total_cost,
            remaining,
            percent_used,
            exceeded: remaining < 0.0,
        }
    }

    /// Write the full state to the persist path.
    async fn persist(&self, state: &mut LedgerState) -> LedgerResult<()> {
        state.last_updated = Some(Utc::now().to_rfc3339());
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.persist_path, bytes).await?;
        Ok(())
    }
}
