//! Manual journal adapter: one debit and one credit, supplied directly

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::account::AccountRegistry;
use crate::ledger::entry::JournalEntryBuilder;
use crate::traits::{LedgerPostable, LedgerStore};
use crate::types::*;

/// An ad-hoc journal where the caller names both accounts and the amount.
/// The adapter emits exactly one debit line and one credit line, verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualJournal {
    pub id: Uuid,
    pub reference: String,
    pub date: NaiveDate,
    pub description: String,
    pub debit_account_code: String,
    pub credit_account_code: String,
    pub amount: BigDecimal,
    pub status: DocumentStatus,
}

impl ManualJournal {
    pub fn new(
        reference: String,
        date: NaiveDate,
        description: String,
        debit_account_code: String,
        credit_account_code: String,
        amount: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            date,
            description,
            debit_account_code,
            credit_account_code,
            amount: round2(&amount),
            status: DocumentStatus::Draft,
        }
    }
}

#[async_trait]
impl LedgerPostable for ManualJournal {
    fn document_id(&self) -> Uuid {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::Manual
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn record(&self) -> DocumentRecord {
        DocumentRecord::new(
            self.id,
            DocumentKind::Manual,
            self.reference.clone(),
            self.status,
        )
    }

    async fn to_draft_entry<S>(
        &self,
        registry: &mut AccountRegistry<S>,
    ) -> LedgerResult<JournalEntry>
    where
        S: LedgerStore + 'static,
    {
        // Both accounts are explicitly identified; a miss is a hard error.
        let debit_account = registry.get_required(&self.debit_account_code).await?;
        let credit_account = registry.get_required(&self.credit_account_code).await?;

        JournalEntryBuilder::new(self.reference.clone(), self.date, self.description.clone())
            .debit(&debit_account, self.amount.clone())
            .credit(&credit_account, self.amount.clone())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;

    #[tokio::test]
    async fn test_manual_journal_emits_verbatim_lines() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        registry
            .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset)
            .await
            .unwrap();
        registry
            .create_account(
                "3000".to_string(),
                "Owner's Equity".to_string(),
                AccountType::Equity,
            )
            .await
            .unwrap();

        let journal = ManualJournal::new(
            "MJ-010".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Owner investment".to_string(),
            "1000".to_string(),
            "3000".to_string(),
            BigDecimal::from(2500),
        );

        let entry = journal.to_draft_entry(&mut registry).await.unwrap();
        assert_eq!(entry.lines.len(), 2);
        assert_eq!(entry.lines[0].account_code, "1000");
        assert_eq!(entry.lines[0].debit, round2(&BigDecimal::from(2500)));
        assert_eq!(entry.lines[1].account_code, "3000");
        assert_eq!(entry.lines[1].credit, round2(&BigDecimal::from(2500)));
    }

    #[tokio::test]
    async fn test_manual_journal_requires_existing_accounts() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        let journal = ManualJournal::new(
            "MJ-011".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            "Broken".to_string(),
            "1000".to_string(),
            "3000".to_string(),
            BigDecimal::from(100),
        );

        let result = journal.to_draft_entry(&mut registry).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }
}
