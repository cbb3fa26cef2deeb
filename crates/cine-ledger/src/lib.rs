//! Cost accounting for inference operations.
//!
//! Every completed operation, including zero-cost local ones, appends a
//! record into a running total and a named bucket, then persists the full
//! ledger state to a JSON file. Budget comparisons are advisory only.

pub mod error;
pub mod ledger;
pub mod pricing;

pub use error::{LedgerError, LedgerResult};
pub use ledger::{BudgetStatus, CostLedger, CostReport};
