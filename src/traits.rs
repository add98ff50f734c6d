//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::ledger::account::AccountRegistry;
use crate::tax::{TaxRate, TaxScope};
use crate::types::*;

/// A balance write staged by the posting engine.
///
/// `expected_version` is the account version observed when the new balance was
/// computed; the store rejects the whole commit with a retryable
/// [`LedgerError::VersionConflict`] if the row has moved on since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub account_code: String,
    pub expected_version: u64,
    pub new_balance: BigDecimal,
}

/// The source-document half of a posting commit: flip the document record to
/// `Posted` and stamp the weak back-reference if it is not already set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentPosting {
    pub document_id: Uuid,
    pub journal_entry_id: Uuid,
}

/// Storage abstraction for the ledger system.
///
/// This trait allows the posting engine to work with any transactional backend
/// (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing these methods.
/// `commit_posting` is the one operation that must be atomic: entry-status
/// flip, every balance update, and the document-status flip all succeed or all
/// roll back.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new account; a duplicate code is an [`LedgerError::AccountCodeConflict`]
    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Get an account by code
    async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>>;

    /// List accounts in code order, optionally filtered by type
    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>>;

    /// Update an account's descriptive fields (name, active flag).
    /// Balance and version are only ever written through `commit_posting`.
    async fn update_account(&mut self, account: &Account) -> LedgerResult<()>;

    /// Save a journal entry. Inserting a new entry or replacing a draft is
    /// allowed; replacing a posted entry is rejected.
    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()>;

    /// Get a journal entry by id
    async fn get_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>>;

    /// Get a journal entry by its unique reference
    async fn get_entry_by_reference(&self, reference: &str) -> LedgerResult<Option<JournalEntry>>;

    /// Save a source-document record
    async fn save_document(&mut self, record: &DocumentRecord) -> LedgerResult<()>;

    /// Get a source-document record by id
    async fn get_document(&self, document_id: Uuid) -> LedgerResult<Option<DocumentRecord>>;

    /// Save a tax rate. When the rate is flagged as default, prior defaults
    /// for the same scope are unset within the same atomic operation.
    async fn save_tax_rate(&mut self, rate: &TaxRate) -> LedgerResult<()>;

    /// Get a tax rate by code
    async fn get_tax_rate(&self, code: &str) -> LedgerResult<Option<TaxRate>>;

    /// List tax rates in code order, optionally filtered by scope
    async fn list_tax_rates(&self, applies_to: Option<TaxScope>) -> LedgerResult<Vec<TaxRate>>;

    /// Atomically commit a posting: persist the posted entry, apply every
    /// balance update (checking versions), and flip the source document.
    /// Any check failure leaves the store exactly as it was.
    async fn commit_posting(
        &mut self,
        entry: &JournalEntry,
        updates: &[BalanceUpdate],
        document: Option<&DocumentPosting>,
    ) -> LedgerResult<()>;
}

/// Structured audit record handed to an external sink when a posting commits.
/// The engine triggers audit emission as a side effect but does not store it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub metadata: HashMap<String, String>,
}

/// Destination for audit records (message queue, table, log pipeline).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Audit sink that discards every event
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}

/// Trait for implementing custom journal entry validation rules
pub trait EntryValidator: Send + Sync {
    /// Validate an entry before posting
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()>;
}

/// Default entry validator applying the double-entry rules
pub struct DefaultEntryValidator;

impl EntryValidator for DefaultEntryValidator {
    fn validate_entry(&self, entry: &JournalEntry) -> LedgerResult<()> {
        entry.validate()
    }
}

/// Capability of a source document to derive a balanced draft journal entry.
///
/// One adapter per document kind implements this; the posting engine provides
/// the single shared transactional path, so no document type re-derives the
/// locking or balance-update logic.
#[async_trait]
pub trait LedgerPostable: Send + Sync {
    /// Stable identifier of the source document
    fn document_id(&self) -> Uuid;

    /// Which adapter family the document belongs to
    fn document_kind(&self) -> DocumentKind;

    /// Human-readable document reference, reused as the entry reference
    fn reference(&self) -> &str;

    /// Ledger-side projection of the document's current state
    fn record(&self) -> DocumentRecord;

    /// Document-level authority gate, checked before any entry is built.
    /// The default allows everything.
    fn authorize(&self) -> LedgerResult<()> {
        Ok(())
    }

    /// Derive a balanced draft entry from the document's domain data,
    /// resolving or provisioning accounts through the registry.
    async fn to_draft_entry<S>(
        &self,
        registry: &mut AccountRegistry<S>,
    ) -> LedgerResult<JournalEntry>
    where
        S: LedgerStore + 'static;
}
