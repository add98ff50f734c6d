//! Posting engine: the draft -> posted state machine and the shared
//! transactional balance-update path used by every document adapter

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Upper bound on optimistic retries before a version conflict is surfaced
/// to the caller as retryable.
const MAX_POSTING_ATTEMPTS: u32 = 32;

/// Posting engine shared by all document adapters.
///
/// `post` is the only path that mutates account balances. It stages every
/// balance update against the account versions it observed, then commits
/// through the store's atomic `commit_posting`; a stale version aborts the
/// commit and the engine re-reads and retries.
pub struct PostingEngine<S: LedgerStore> {
    store: S,
    validator: Box<dyn EntryValidator>,
    audit: Arc<dyn AuditSink>,
}

impl<S: LedgerStore> PostingEngine<S> {
    /// Create a new posting engine with the default validator and no audit sink
    pub fn new(store: S) -> Self {
        Self {
            store,
            validator: Box::new(DefaultEntryValidator),
            audit: Arc::new(NullAuditSink),
        }
    }

    /// Create a posting engine that emits audit events to the given sink
    pub fn with_audit_sink(store: S, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            validator: Box::new(DefaultEntryValidator),
            audit,
        }
    }

    /// Replace the entry validator
    pub fn with_validator(mut self, validator: Box<dyn EntryValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Post a draft entry. Re-posting a posted entry is an
    /// [`LedgerError::AlreadyPosted`] conflict.
    pub async fn post(&mut self, entry_id: Uuid, actor: &str) -> LedgerResult<JournalEntry> {
        self.execute_post(entry_id, actor, None).await
    }

    /// Post a draft entry, treating an already-posted entry as success and
    /// returning it unchanged. Balances are never applied twice.
    pub async fn post_idempotent(
        &mut self,
        entry_id: Uuid,
        actor: &str,
    ) -> LedgerResult<JournalEntry> {
        match self.execute_post(entry_id, actor, None).await {
            Err(LedgerError::AlreadyPosted(_)) => self
                .store
                .get_entry(entry_id)
                .await?
                .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string())),
            other => other,
        }
    }

    /// Post a draft entry on behalf of a source document: the document record
    /// flips to `Posted` and receives its back-reference in the same commit.
    pub async fn post_with_document(
        &mut self,
        entry_id: Uuid,
        document_id: Uuid,
        actor: &str,
    ) -> LedgerResult<JournalEntry> {
        if self.store.get_document(document_id).await?.is_none() {
            return Err(LedgerError::DocumentNotFound(document_id.to_string()));
        }
        let posting = DocumentPosting {
            document_id,
            journal_entry_id: entry_id,
        };
        self.execute_post(entry_id, actor, Some(posting)).await
    }

    async fn execute_post(
        &mut self,
        entry_id: Uuid,
        actor: &str,
        document: Option<DocumentPosting>,
    ) -> LedgerResult<JournalEntry> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let entry = self
                .store
                .get_entry(entry_id)
                .await?
                .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))?;

            match entry.status {
                EntryStatus::Draft => {}
                EntryStatus::Posted => return Err(LedgerError::AlreadyPosted(entry.reference)),
                EntryStatus::Reversed => {
                    return Err(LedgerError::InvalidEntry(format!(
                        "journal entry '{}' has been reversed and cannot be posted",
                        entry.reference
                    )))
                }
            }

            self.validator.validate_entry(&entry)?;

            // Balance is re-checked here regardless of what the validator did.
            if !entry.is_balanced() {
                return Err(LedgerError::ImbalancedEntry {
                    reference: entry.reference.clone(),
                    debits: entry.total_debits(),
                    credits: entry.total_credits(),
                });
            }

            let updates = self.stage_balance_updates(&entry).await?;

            let now = chrono::Utc::now().naive_utc();
            let mut posted = entry;
            posted.status = EntryStatus::Posted;
            posted.posted_at = Some(now);
            posted.posted_by = Some(actor.to_string());
            posted.updated_at = now;

            match self
                .store
                .commit_posting(&posted, &updates, document.as_ref())
                .await
            {
                Ok(()) => {
                    info!(
                        reference = %posted.reference,
                        actor = %actor,
                        lines = posted.lines.len(),
                        "posted journal entry"
                    );
                    self.emit_audit(&posted, actor, document.as_ref()).await;
                    return Ok(posted);
                }
                Err(err @ LedgerError::VersionConflict { .. }) => {
                    if attempt >= MAX_POSTING_ATTEMPTS {
                        return Err(err);
                    }
                    warn!(
                        reference = %posted.reference,
                        attempt,
                        "balance version conflict, retrying posting"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Aggregate line effects per account and compute each account's new
    /// balance against the version observed now.
    async fn stage_balance_updates(
        &self,
        entry: &JournalEntry,
    ) -> LedgerResult<Vec<BalanceUpdate>> {
        let zero = BigDecimal::from(0);
        let mut order: Vec<String> = Vec::new();
        let mut effects: HashMap<String, (BigDecimal, BigDecimal)> = HashMap::new();

        for line in &entry.lines {
            let slot = effects
                .entry(line.account_code.clone())
                .or_insert_with(|| {
                    order.push(line.account_code.clone());
                    (zero.clone(), zero.clone())
                });
            slot.0 += &line.debit;
            slot.1 += &line.credit;
        }

        let mut updates = Vec::with_capacity(order.len());
        for code in order {
            let account = self
                .store
                .get_account(&code)
                .await?
                .ok_or_else(|| LedgerError::AccountNotFound(code.clone()))?;
            let (debit, credit) = &effects[&code];
            updates.push(BalanceUpdate {
                account_code: code,
                expected_version: account.version,
                new_balance: account.apply_effect(debit, credit),
            });
        }
        Ok(updates)
    }

    async fn emit_audit(&self, entry: &JournalEntry, actor: &str, document: Option<&DocumentPosting>) {
        let mut metadata = HashMap::new();
        metadata.insert("reference".to_string(), entry.reference.clone());
        metadata.insert("posted_by".to_string(), actor.to_string());
        metadata.insert("total_debits".to_string(), entry.total_debits().to_string());
        metadata.insert("total_credits".to_string(), entry.total_credits().to_string());
        metadata.insert("lines".to_string(), entry.lines.len().to_string());

        self.audit
            .record(AuditEvent {
                action: "journal_entry.posted".to_string(),
                target_type: "journal_entry".to_string(),
                target_id: entry.id.to_string(),
                metadata,
            })
            .await;

        if let Some(doc) = document {
            let mut metadata = HashMap::new();
            metadata.insert(
                "journal_entry_id".to_string(),
                doc.journal_entry_id.to_string(),
            );
            self.audit
                .record(AuditEvent {
                    action: "document.posted".to_string(),
                    target_type: "document".to_string(),
                    target_id: doc.document_id.to_string(),
                    metadata,
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entry::JournalEntryBuilder;
    use crate::utils::memory_store::MemoryStore;
    use chrono::NaiveDate;

    async fn seed_accounts(store: &mut MemoryStore) -> (Account, Account) {
        let cash = Account::new("1000".to_string(), "Cash".to_string(), AccountType::Asset);
        let payable = Account::new(
            "2000".to_string(),
            "Accounts Payable".to_string(),
            AccountType::Liability,
        );
        store.insert_account(&cash).await.unwrap();
        store.insert_account(&payable).await.unwrap();
        (cash, payable)
    }

    fn sample_entry(cash: &Account, payable: &Account, amount: i64) -> JournalEntry {
        JournalEntryBuilder::new(
            format!("JE-{amount}"),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "Sample journal".to_string(),
        )
        .debit(cash, BigDecimal::from(amount))
        .credit(payable, BigDecimal::from(amount))
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_sample_journal_updates_both_balances() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;
        let entry = sample_entry(&cash, &payable, 1000);
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store.clone());
        let posted = engine.post(entry.id, "alice").await.unwrap();

        assert_eq!(posted.status, EntryStatus::Posted);
        assert_eq!(posted.posted_by.as_deref(), Some("alice"));
        assert!(posted.posted_at.is_some());

        // Debit-normal cash goes up by 1000; credit-normal payable also up by 1000.
        let cash = store.get_account("1000").await.unwrap().unwrap();
        let payable = store.get_account("2000").await.unwrap().unwrap();
        assert_eq!(cash.balance, round2(&BigDecimal::from(1000)));
        assert_eq!(payable.balance, round2(&BigDecimal::from(1000)));
        assert_eq!(cash.version, 1);
        assert_eq!(payable.version, 1);
    }

    #[tokio::test]
    async fn test_reposting_is_a_conflict_and_idempotent_variant_returns_entry() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;
        let entry = sample_entry(&cash, &payable, 250);
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store.clone());
        engine.post(entry.id, "alice").await.unwrap();

        let second = engine.post(entry.id, "alice").await;
        assert!(matches!(second, Err(LedgerError::AlreadyPosted(_))));

        let again = engine.post_idempotent(entry.id, "alice").await.unwrap();
        assert_eq!(again.status, EntryStatus::Posted);

        // Balances applied exactly once.
        let cash = store.get_account("1000").await.unwrap().unwrap();
        assert_eq!(cash.balance, round2(&BigDecimal::from(250)));
        assert_eq!(cash.version, 1);
    }

    #[tokio::test]
    async fn test_imbalanced_entry_leaves_all_state_untouched() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;

        let mut entry = JournalEntry::new(
            "JE-BAD".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "Imbalanced".to_string(),
        );
        entry
            .add_line(JournalLine::debit(&cash, BigDecimal::from(500)))
            .unwrap();
        entry
            .add_line(JournalLine::credit(&payable, BigDecimal::from(400)))
            .unwrap();
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store.clone());
        let result = engine.post(entry.id, "alice").await;
        match result {
            Err(LedgerError::ImbalancedEntry {
                reference,
                debits,
                credits,
            }) => {
                assert_eq!(reference, "JE-BAD");
                assert_eq!(debits, round2(&BigDecimal::from(500)));
                assert_eq!(credits, round2(&BigDecimal::from(400)));
            }
            other => panic!("expected ImbalancedEntry, got {other:?}"),
        }

        let cash = store.get_account("1000").await.unwrap().unwrap();
        let payable = store.get_account("2000").await.unwrap().unwrap();
        assert_eq!(cash.balance, BigDecimal::from(0));
        assert_eq!(payable.balance, BigDecimal::from(0));
        let stored = store.get_entry(entry.id).await.unwrap().unwrap();
        assert_eq!(stored.status, EntryStatus::Draft);
    }

    #[tokio::test]
    async fn test_missing_account_rejects_posting() {
        let mut store = MemoryStore::new();
        let (cash, _) = seed_accounts(&mut store).await;
        let ghost = Account::new("7777".to_string(), "Ghost".to_string(), AccountType::Expense);

        let entry = JournalEntryBuilder::new(
            "JE-GHOST".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "References a non-existent account".to_string(),
        )
        .debit(&ghost, BigDecimal::from(10))
        .credit(&cash, BigDecimal::from(10))
        .build()
        .unwrap();
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store.clone());
        let result = engine.post(entry.id, "alice").await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(code)) if code == "7777"));
    }

    #[tokio::test]
    async fn test_multiple_lines_against_same_account_apply_once() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;

        let entry = JournalEntryBuilder::new(
            "JE-SPLIT".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            "Two debits against cash".to_string(),
        )
        .debit(&cash, BigDecimal::from(60))
        .debit(&cash, BigDecimal::from(40))
        .credit(&payable, BigDecimal::from(100))
        .build()
        .unwrap();
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store.clone());
        engine.post(entry.id, "alice").await.unwrap();

        let cash = store.get_account("1000").await.unwrap().unwrap();
        assert_eq!(cash.balance, round2(&BigDecimal::from(100)));
        // One aggregated balance write, one version bump.
        assert_eq!(cash.version, 1);
    }

    #[tokio::test]
    async fn test_reversed_entry_cannot_be_posted() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;
        let mut entry = sample_entry(&cash, &payable, 80);
        entry.status = EntryStatus::Reversed;
        store.save_entry(&entry).await.unwrap();

        let mut engine = PostingEngine::new(store);
        let result = engine.post(entry.id, "alice").await;
        assert!(matches!(result, Err(LedgerError::InvalidEntry(_))));
    }

    #[tokio::test]
    async fn test_audit_events_emitted_on_post() {
        let mut store = MemoryStore::new();
        let (cash, payable) = seed_accounts(&mut store).await;
        let entry = sample_entry(&cash, &payable, 75);
        store.save_entry(&entry).await.unwrap();

        let sink = Arc::new(crate::utils::memory_store::MemoryAuditSink::new());
        let mut engine = PostingEngine::with_audit_sink(store, sink.clone());
        engine.post(entry.id, "auditor").await.unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "journal_entry.posted");
        assert_eq!(events[0].target_type, "journal_entry");
        assert_eq!(events[0].metadata["posted_by"], "auditor");
    }
}
