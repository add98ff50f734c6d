//! In-memory storage implementation for testing and development

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::tax::{TaxRate, TaxScope};
use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<String, Account>,
    entries: HashMap<Uuid, JournalEntry>,
    entry_refs: HashMap<String, Uuid>,
    documents: HashMap<Uuid, DocumentRecord>,
    tax_rates: BTreeMap<String, TaxRate>,
}

/// In-memory ledger store.
///
/// One lock guards the whole dataset, so `commit_posting` and tax-default
/// maintenance are genuinely atomic, the way a database transaction would be.
/// Accounts are kept in code order, which makes "first active account of a
/// type" deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new memory store instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.accounts.contains_key(&account.code) {
            return Err(LedgerError::AccountCodeConflict(account.code.clone()));
        }
        inner.accounts.insert(account.code.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        Ok(self.inner.read().unwrap().accounts.get(code).cloned())
    }

    async fn list_accounts(&self, account_type: Option<AccountType>) -> LedgerResult<Vec<Account>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .accounts
            .values()
            .filter(|a| account_type.is_none_or(|t| a.account_type == t))
            .cloned()
            .collect())
    }

    async fn update_account(&mut self, account: &Account) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.accounts.get_mut(&account.code) {
            Some(stored) => {
                stored.name = account.name.clone();
                stored.active = account.active;
                stored.updated_at = account.updated_at;
                Ok(())
            }
            None => Err(LedgerError::AccountNotFound(account.code.clone())),
        }
    }

    async fn save_entry(&mut self, entry: &JournalEntry) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();

        if let Some(existing_id) = inner.entry_refs.get(&entry.reference) {
            if *existing_id != entry.id {
                return Err(LedgerError::Validation(format!(
                    "journal entry reference '{}' is already in use",
                    entry.reference
                )));
            }
        }
        if let Some(existing) = inner.entries.get(&entry.id) {
            if existing.status != EntryStatus::Draft {
                return Err(LedgerError::AlreadyPosted(existing.reference.clone()));
            }
        }

        inner.entry_refs.insert(entry.reference.clone(), entry.id);
        inner.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        Ok(self.inner.read().unwrap().entries.get(&entry_id).cloned())
    }

    async fn get_entry_by_reference(&self, reference: &str) -> LedgerResult<Option<JournalEntry>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .entry_refs
            .get(reference)
            .and_then(|id| inner.entries.get(id))
            .cloned())
    }

    async fn save_document(&mut self, record: &DocumentRecord) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.documents.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_document(&self, document_id: Uuid) -> LedgerResult<Option<DocumentRecord>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .documents
            .get(&document_id)
            .cloned())
    }

    async fn save_tax_rate(&mut self, rate: &TaxRate) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();
        // Read-then-write on the defaults happens under the same lock as the
        // insert, so two defaults for one scope cannot race into existence.
        if rate.is_default {
            for other in inner.tax_rates.values_mut() {
                if other.code != rate.code && other.applies_to == rate.applies_to {
                    other.is_default = false;
                }
            }
        }
        inner.tax_rates.insert(rate.code.clone(), rate.clone());
        Ok(())
    }

    async fn get_tax_rate(&self, code: &str) -> LedgerResult<Option<TaxRate>> {
        Ok(self.inner.read().unwrap().tax_rates.get(code).cloned())
    }

    async fn list_tax_rates(&self, applies_to: Option<TaxScope>) -> LedgerResult<Vec<TaxRate>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .tax_rates
            .values()
            .filter(|r| applies_to.is_none_or(|scope| r.applies_to == scope))
            .cloned()
            .collect())
    }

    async fn commit_posting(
        &mut self,
        entry: &JournalEntry,
        updates: &[BalanceUpdate],
        document: Option<&DocumentPosting>,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.write().unwrap();

        // Phase 1: validate everything before touching anything.
        let stored = inner
            .entries
            .get(&entry.id)
            .ok_or_else(|| LedgerError::EntryNotFound(entry.id.to_string()))?;
        if stored.status != EntryStatus::Draft {
            return Err(LedgerError::AlreadyPosted(stored.reference.clone()));
        }

        for update in updates {
            let account = inner
                .accounts
                .get(&update.account_code)
                .ok_or_else(|| LedgerError::AccountNotFound(update.account_code.clone()))?;
            if account.version != update.expected_version {
                return Err(LedgerError::VersionConflict {
                    account_code: update.account_code.clone(),
                    expected: update.expected_version,
                    found: account.version,
                });
            }
        }

        if let Some(doc) = document {
            if !inner.documents.contains_key(&doc.document_id) {
                return Err(LedgerError::DocumentNotFound(doc.document_id.to_string()));
            }
        }

        // Phase 2: apply the whole commit. Every row was checked above.
        let now = chrono::Utc::now().naive_utc();
        for update in updates {
            if let Some(account) = inner.accounts.get_mut(&update.account_code) {
                account.balance = round2(&update.new_balance);
                account.version += 1;
                account.updated_at = now;
            }
        }

        inner.entries.insert(entry.id, entry.clone());

        if let Some(doc) = document {
            if let Some(record) = inner.documents.get_mut(&doc.document_id) {
                record.status = DocumentStatus::Posted;
                if record.journal_entry_id.is_none() {
                    record.journal_entry_id = Some(doc.journal_entry_id);
                }
            }
        }

        Ok(())
    }
}

/// Audit sink that captures events in memory for assertions
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Create a new capturing sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.write().unwrap().push(event);
    }
}
