//! Expense adapter: expense account against a payment or payables account,
//! gated by the approver's limit

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::account::{defaults, AccountRegistry, AccountSelector};
use crate::ledger::entry::JournalEntryBuilder;
use crate::traits::{LedgerPostable, LedgerStore};
use crate::types::*;

/// The actor that approved an expense, with the ceiling of their authority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approver {
    pub id: String,
    pub approval_limit: BigDecimal,
}

/// An expense claim as handed over by the expense collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    /// Human-readable expense reference (e.g. "EXP-2024-0007")
    pub reference: String,
    pub date: NaiveDate,
    pub description: String,
    /// Amount excluding tax
    pub amount: BigDecimal,
    pub tax_amount: BigDecimal,
    /// Explicit expense account; when unset, the first active Expense account
    /// is used, falling back to the auto-provisioned default
    pub expense_account_code: Option<String>,
    /// Explicit payment/liability account; when unset, Accounts Payable is
    /// looked up or auto-provisioned
    pub payment_account_code: Option<String>,
    /// Approver whose limit must cover the grand total
    pub approver: Option<Approver>,
    pub status: DocumentStatus,
}

impl Expense {
    pub fn new(
        reference: String,
        date: NaiveDate,
        description: String,
        amount: BigDecimal,
        tax_amount: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            date,
            description,
            amount: round2(&amount),
            tax_amount: round2(&tax_amount),
            expense_account_code: None,
            payment_account_code: None,
            approver: None,
            status: DocumentStatus::Approved,
        }
    }

    pub fn with_expense_account(mut self, code: impl Into<String>) -> Self {
        self.expense_account_code = Some(code.into());
        self
    }

    pub fn with_payment_account(mut self, code: impl Into<String>) -> Self {
        self.payment_account_code = Some(code.into());
        self
    }

    pub fn approved_by(mut self, approver: Approver) -> Self {
        self.approver = Some(approver);
        self
    }

    /// Amount plus tax: the figure both lines carry
    pub fn grand_total(&self) -> BigDecimal {
        round2(&(&self.amount + &self.tax_amount))
    }
}

#[async_trait]
impl LedgerPostable for Expense {
    fn document_id(&self) -> Uuid {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::Expense
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn record(&self) -> DocumentRecord {
        DocumentRecord::new(
            self.id,
            DocumentKind::Expense,
            self.reference.clone(),
            self.status,
        )
    }

    /// Approval-limit gate, checked before any entry is built or posted
    fn authorize(&self) -> LedgerResult<()> {
        if let Some(approver) = &self.approver {
            let required = self.grand_total();
            if approver.approval_limit < required {
                return Err(LedgerError::InsufficientAuthority {
                    required,
                    limit: approver.approval_limit.clone(),
                });
            }
        }
        Ok(())
    }

    /// Debit the expense account for `amount + tax_amount`, credit the
    /// payment account for the same total.
    async fn to_draft_entry<S>(
        &self,
        registry: &mut AccountRegistry<S>,
    ) -> LedgerResult<JournalEntry>
    where
        S: LedgerStore + 'static,
    {
        let expense_account = match &self.expense_account_code {
            Some(code) => registry.get_required(code).await?,
            None => {
                registry
                    .find_or_create(
                        AccountSelector::first_of_type(AccountType::Expense),
                        &defaults::GENERAL_EXPENSE,
                    )
                    .await?
            }
        };

        let payment_account = match &self.payment_account_code {
            Some(code) => registry.get_required(code).await?,
            None => {
                registry
                    .find_or_create(
                        AccountSelector::code(defaults::ACCOUNTS_PAYABLE.code)
                            .or_name_contains("Payable")
                            .of_type(AccountType::Liability),
                        &defaults::ACCOUNTS_PAYABLE,
                    )
                    .await?
            }
        };

        let total = self.grand_total();
        JournalEntryBuilder::new(
            self.reference.clone(),
            self.date,
            format!("Expense {} - {}", self.reference, self.description),
        )
        .debit(&expense_account, total.clone())
        .credit(&payment_account, total)
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;
    use std::str::FromStr;

    fn expense() -> Expense {
        Expense::new(
            "EXP-001".to_string(),
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            "Office supplies".to_string(),
            BigDecimal::from(500),
            BigDecimal::from(60),
        )
    }

    #[tokio::test]
    async fn test_expense_debits_total_with_tax() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        let entry = expense().to_draft_entry(&mut registry).await.unwrap();

        let total = BigDecimal::from_str("560.00").unwrap();
        assert_eq!(entry.lines.len(), 2);
        assert_eq!(entry.lines[0].account_code, "5000");
        assert_eq!(entry.lines[0].debit, total);
        assert_eq!(entry.lines[1].account_code, "2000");
        assert_eq!(entry.lines[1].credit, total);
        assert!(entry.is_balanced());
    }

    #[tokio::test]
    async fn test_expense_uses_designated_accounts() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        registry
            .create_account(
                "5300".to_string(),
                "Travel Expense".to_string(),
                AccountType::Expense,
            )
            .await
            .unwrap();
        registry
            .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset)
            .await
            .unwrap();

        let expense = expense()
            .with_expense_account("5300")
            .with_payment_account("1000");
        let entry = expense.to_draft_entry(&mut registry).await.unwrap();

        assert_eq!(entry.lines[0].account_code, "5300");
        assert_eq!(entry.lines[1].account_code, "1000");
    }

    #[tokio::test]
    async fn test_explicit_missing_account_is_not_found() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        let expense = expense().with_expense_account("5999");

        let result = expense.to_draft_entry(&mut registry).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(code)) if code == "5999"));
    }

    #[test]
    fn test_approval_limit_gate() {
        let within = expense().approved_by(Approver {
            id: "mgr-1".to_string(),
            approval_limit: BigDecimal::from(1000),
        });
        assert!(within.authorize().is_ok());

        let above = expense().approved_by(Approver {
            id: "mgr-1".to_string(),
            approval_limit: BigDecimal::from(500),
        });
        match above.authorize() {
            Err(LedgerError::InsufficientAuthority { required, limit }) => {
                assert_eq!(required, BigDecimal::from_str("560.00").unwrap());
                assert_eq!(limit, BigDecimal::from(500));
            }
            other => panic!("expected InsufficientAuthority, got {other:?}"),
        }
    }
}
