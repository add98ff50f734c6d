//! # Ledger Core
//!
//! A double-entry ledger posting engine: document adapters derive balanced
//! journal entries from business documents (invoices, expenses, ad-hoc
//! journals), and a shared posting engine turns them into immutable entries
//! while atomically updating running account balances.
//!
//! ## Features
//!
//! - **Double-entry bookkeeping**: balance validation and a draft -> posted
//!   state machine with immutability once posted
//! - **Account registry**: deterministic lookup and auto-provisioning of
//!   well-known default accounts, race-safe under concurrent creation
//! - **Optimistic balance updates**: versioned accounts, atomic commits, and
//!   retry on conflict so concurrent postings never lose an effect
//! - **Document adapters**: invoice, expense, and manual-journal flows over
//!   one shared `LedgerPostable` capability
//! - **Tax calculation**: percentage and fixed rates, inclusive or exclusive,
//!   with effectiveness windows and per-scope defaults
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   storage
//!
//! ## Quick Start
//!
//! ```rust
//! use ledger_core::{Invoice, Ledger, MemoryStore};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut ledger = Ledger::new(MemoryStore::new());
//!
//! let invoice = Invoice::new(
//!     "INV-001".to_string(),
//!     NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
//!     "Acme Pty Ltd".to_string(),
//!     BigDecimal::from(1120),
//!     BigDecimal::from(120),
//! );
//!
//! let posted = ledger.post_document(&invoice, "alice").await?;
//! assert_eq!(posted.lines.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod documents;
pub mod ledger;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use documents::*;
pub use ledger::*;
pub use tax::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_store::{MemoryAuditSink, MemoryStore};

// Re-export the default account catalog for convenience
pub use ledger::account::defaults;
