//! Invoice adapter: accounts receivable against a single revenue bucket

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::account::{defaults, AccountRegistry, AccountSelector};
use crate::ledger::entry::JournalEntryBuilder;
use crate::traits::{LedgerPostable, LedgerStore};
use crate::types::*;

/// A customer invoice as handed over by the invoicing collaborator.
///
/// `total` is tax-inclusive; `tax_amount` is informational for the ledger and
/// carried onto the receivable line's tax label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    /// Human-readable invoice reference (e.g. "INV-2024-0042")
    pub reference: String,
    pub date: NaiveDate,
    pub customer_name: String,
    /// Grand total, tax included
    pub total: BigDecimal,
    /// Tax portion embedded in the total
    pub tax_amount: BigDecimal,
    /// Label of the tax rate applied, if any
    pub tax_code: Option<String>,
    pub status: DocumentStatus,
}

impl Invoice {
    pub fn new(
        reference: String,
        date: NaiveDate,
        customer_name: String,
        total: BigDecimal,
        tax_amount: BigDecimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference,
            date,
            customer_name,
            total: round2(&total),
            tax_amount: round2(&tax_amount),
            tax_code: None,
            status: DocumentStatus::Approved,
        }
    }

    pub fn with_tax_code(mut self, tax_code: impl Into<String>) -> Self {
        self.tax_code = Some(tax_code.into());
        self
    }
}

#[async_trait]
impl LedgerPostable for Invoice {
    fn document_id(&self) -> Uuid {
        self.id
    }

    fn document_kind(&self) -> DocumentKind {
        DocumentKind::Invoice
    }

    fn reference(&self) -> &str {
        &self.reference
    }

    fn record(&self) -> DocumentRecord {
        DocumentRecord::new(
            self.id,
            DocumentKind::Invoice,
            self.reference.clone(),
            self.status,
        )
    }

    /// Debit receivables for the tax-inclusive total, credit a single revenue
    /// account for the same total. Always exactly two lines: per-item revenue
    /// attribution happens in the invoicing read path, not in posting.
    async fn to_draft_entry<S>(
        &self,
        registry: &mut AccountRegistry<S>,
    ) -> LedgerResult<JournalEntry>
    where
        S: LedgerStore + 'static,
    {
        let receivable = registry
            .find_or_create(
                AccountSelector::code(defaults::ACCOUNTS_RECEIVABLE.code)
                    .or_name_contains("Receivable")
                    .of_type(AccountType::Asset),
                &defaults::ACCOUNTS_RECEIVABLE,
            )
            .await?;

        let revenue = registry
            .find_or_create(
                AccountSelector::first_of_type(AccountType::Revenue),
                &defaults::SALES_REVENUE,
            )
            .await?;

        let mut debit = JournalLine::debit(&receivable, self.total.clone())
            .with_memo(format!("Invoice {} - {}", self.reference, self.customer_name));
        if let Some(tax_code) = &self.tax_code {
            debit = debit.with_tax_code(tax_code.clone());
        }

        JournalEntryBuilder::new(
            self.reference.clone(),
            self.date,
            format!("Invoice {} for {}", self.reference, self.customer_name),
        )
        .line(debit)
        .credit(&revenue, self.total.clone())
        .build()
    }
}
