//! Main ledger facade that coordinates the account registry, the posting
//! engine, and the document adapters

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::ledger::{AccountRegistry, PostingEngine};
use crate::traits::*;
use crate::types::*;

/// Main entry point for collaborators.
///
/// Source documents come in through [`Ledger::create_journal_entry`] and
/// [`Ledger::post_document`]; posted statuses and updated balances come back
/// out. Tenancy is resolved by the caller: one `Ledger` per tenant store.
pub struct Ledger<S: LedgerStore + Clone> {
    registry: AccountRegistry<S>,
    engine: PostingEngine<S>,
    store: S,
}

impl<S: LedgerStore + Clone + 'static> Ledger<S> {
    /// Create a new ledger with the given storage backend
    pub fn new(store: S) -> Self {
        Self {
            registry: AccountRegistry::new(store.clone()),
            engine: PostingEngine::new(store.clone()),
            store,
        }
    }

    /// Create a new ledger that emits audit events to the given sink
    pub fn with_audit_sink(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            registry: AccountRegistry::new(store.clone()),
            engine: PostingEngine::with_audit_sink(store.clone(), audit),
            store,
        }
    }

    // Account operations
    /// Create a new account
    pub async fn create_account(
        &mut self,
        code: String,
        name: String,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        self.registry.create_account(code, name, account_type).await
    }

    /// Get an account by code
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        self.registry.get_account(code).await
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.registry.list_accounts().await
    }

    /// Current balance of an account
    pub async fn get_account_balance(&self, code: &str) -> LedgerResult<BigDecimal> {
        self.registry.get_balance(code).await
    }

    /// Soft-deactivate an account
    pub async fn deactivate_account(&mut self, code: &str) -> LedgerResult<Account> {
        self.registry.deactivate(code).await
    }

    /// Provision the well-known default chart of accounts
    pub async fn create_default_chart(&mut self) -> LedgerResult<HashMap<String, Account>> {
        crate::ledger::account::utils::create_default_chart(&mut self.registry).await
    }

    // Document and entry operations
    /// Build and persist a draft journal entry from a source document.
    /// The document's ledger record is registered alongside the draft.
    pub async fn create_journal_entry<D: LedgerPostable>(
        &mut self,
        document: &D,
    ) -> LedgerResult<JournalEntry> {
        document.authorize()?;

        let entry = document.to_draft_entry(&mut self.registry).await?;
        self.store.save_entry(&entry).await?;

        if self.store.get_document(document.document_id()).await?.is_none() {
            self.store.save_document(&document.record()).await?;
        }

        Ok(entry)
    }

    /// Post a draft entry by id. Raises [`LedgerError::AlreadyPosted`] on a
    /// second call; use [`Ledger::post_idempotent`] for at-least-once callers.
    pub async fn post(&mut self, entry_id: Uuid, actor: &str) -> LedgerResult<JournalEntry> {
        self.engine.post(entry_id, actor).await
    }

    /// Post a draft entry, returning the stored entry unchanged if it has
    /// already been posted
    pub async fn post_idempotent(
        &mut self,
        entry_id: Uuid,
        actor: &str,
    ) -> LedgerResult<JournalEntry> {
        self.engine.post_idempotent(entry_id, actor).await
    }

    /// Post a source document end to end: derive (or reuse) its draft entry,
    /// post it, flip the document to `Posted`, and stamp its back-reference -
    /// all in one atomic commit.
    pub async fn post_document<D: LedgerPostable>(
        &mut self,
        document: &D,
        actor: &str,
    ) -> LedgerResult<JournalEntry> {
        document.authorize()?;

        let record = match self.store.get_document(document.document_id()).await? {
            Some(record) => record,
            None => {
                let record = document.record();
                self.store.save_document(&record).await?;
                record
            }
        };

        let entry_id = match record.journal_entry_id {
            Some(id) => id,
            None => match self.store.get_entry_by_reference(document.reference()).await? {
                Some(entry) => entry.id,
                None => {
                    let entry = document.to_draft_entry(&mut self.registry).await?;
                    self.store.save_entry(&entry).await?;
                    entry.id
                }
            },
        };

        self.engine
            .post_with_document(entry_id, document.document_id(), actor)
            .await
    }

    /// Get a journal entry by id
    pub async fn get_journal_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        self.store.get_entry(entry_id).await
    }

    /// Get a journal entry by its unique reference
    pub async fn get_journal_entry_by_reference(
        &self,
        reference: &str,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.store.get_entry_by_reference(reference).await
    }

    /// Get the ledger-side record of a source document
    pub async fn get_document(&self, document_id: Uuid) -> LedgerResult<DocumentRecord> {
        self.store
            .get_document(document_id)
            .await?
            .ok_or_else(|| LedgerError::DocumentNotFound(document_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::ManualJournal;
    use crate::utils::memory_store::MemoryStore;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_ledger_manual_journal_roundtrip() {
        let mut ledger = Ledger::new(MemoryStore::new());
        ledger
            .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset)
            .await
            .unwrap();
        ledger
            .create_account(
                "2000".to_string(),
                "Accounts Payable".to_string(),
                AccountType::Liability,
            )
            .await
            .unwrap();

        let journal = ManualJournal::new(
            "MJ-001".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Opening entry".to_string(),
            "1000".to_string(),
            "2000".to_string(),
            BigDecimal::from(1000),
        );

        let draft = ledger.create_journal_entry(&journal).await.unwrap();
        assert_eq!(draft.status, EntryStatus::Draft);

        let posted = ledger.post(draft.id, "alice").await.unwrap();
        assert_eq!(posted.status, EntryStatus::Posted);

        assert_eq!(
            ledger.get_account_balance("1000").await.unwrap(),
            round2(&BigDecimal::from(1000))
        );
        assert_eq!(
            ledger.get_account_balance("2000").await.unwrap(),
            round2(&BigDecimal::from(1000))
        );
    }

    #[tokio::test]
    async fn test_post_document_flips_record_and_stamps_backreference() {
        let mut ledger = Ledger::new(MemoryStore::new());
        ledger.create_default_chart().await.unwrap();

        let journal = ManualJournal::new(
            "MJ-002".to_string(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            "Transfer".to_string(),
            "1000".to_string(),
            "2000".to_string(),
            BigDecimal::from(300),
        );

        let posted = ledger.post_document(&journal, "bob").await.unwrap();

        let record = ledger.get_document(journal.id).await.unwrap();
        assert_eq!(record.status, DocumentStatus::Posted);
        assert_eq!(record.journal_entry_id, Some(posted.id));

        // A second post of the same document is a detectable conflict.
        let again = ledger.post_document(&journal, "bob").await;
        assert!(matches!(again, Err(LedgerError::AlreadyPosted(_))));
    }
}
