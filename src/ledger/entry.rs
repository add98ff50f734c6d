//! Journal entry construction

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::*;

/// Fluent builder for draft journal entries.
///
/// `build` validates the double-entry rules, so a successfully built entry is
/// balanced by construction.
#[derive(Debug)]
pub struct JournalEntryBuilder {
    entry: JournalEntry,
}

impl JournalEntryBuilder {
    /// Create a new entry builder
    pub fn new(reference: String, date: NaiveDate, description: String) -> Self {
        Self {
            entry: JournalEntry::new(reference, date, description),
        }
    }

    /// Add metadata to the entry
    pub fn metadata(mut self, key: String, value: String) -> Self {
        self.entry.metadata.insert(key, value);
        self
    }

    /// Add a debit line
    pub fn debit(mut self, account: &Account, amount: BigDecimal) -> Self {
        self.entry.lines.push(JournalLine::debit(account, amount));
        self
    }

    /// Add a credit line
    pub fn credit(mut self, account: &Account, amount: BigDecimal) -> Self {
        self.entry.lines.push(JournalLine::credit(account, amount));
        self
    }

    /// Add a prepared line (e.g. one carrying a memo or tax label)
    pub fn line(mut self, line: JournalLine) -> Self {
        self.entry.lines.push(line);
        self
    }

    /// Build the draft entry, validating the double-entry rules
    pub fn build(self) -> LedgerResult<JournalEntry> {
        self.entry.validate()?;
        Ok(self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash() -> Account {
        Account::new("1000".to_string(), "Cash".to_string(), AccountType::Asset)
    }

    fn revenue() -> Account {
        Account::new(
            "4000".to_string(),
            "Sales Revenue".to_string(),
            AccountType::Revenue,
        )
    }

    #[test]
    fn test_builder_produces_balanced_draft() {
        let entry = JournalEntryBuilder::new(
            "JE-100".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Cash sale".to_string(),
        )
        .debit(&cash(), BigDecimal::from(250))
        .credit(&revenue(), BigDecimal::from(250))
        .build()
        .unwrap();

        assert_eq!(entry.status, EntryStatus::Draft);
        assert_eq!(entry.lines.len(), 2);
        assert!(entry.is_balanced());
        assert_eq!(entry.lines[0].account_name, "Cash");
        assert!(entry.posted_at.is_none());
    }

    #[test]
    fn test_builder_rejects_imbalance() {
        let result = JournalEntryBuilder::new(
            "JE-101".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Bad entry".to_string(),
        )
        .debit(&cash(), BigDecimal::from(500))
        .credit(&revenue(), BigDecimal::from(400))
        .build();

        assert!(matches!(result, Err(LedgerError::ImbalancedEntry { .. })));
    }

    #[test]
    fn test_builder_rejects_single_line() {
        let result = JournalEntryBuilder::new(
            "JE-102".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "One-sided".to_string(),
        )
        .debit(&cash(), BigDecimal::from(0))
        .build();

        assert!(matches!(result, Err(LedgerError::InvalidEntry(_))));
    }

    #[test]
    fn test_line_with_memo_and_tax_code() {
        let line = JournalLine::debit(&cash(), BigDecimal::from(112))
            .with_memo("Tax inclusive")
            .with_tax_code("VAT12");

        let entry = JournalEntryBuilder::new(
            "JE-103".to_string(),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            "Sale with tax label".to_string(),
        )
        .line(line)
        .credit(&revenue(), BigDecimal::from(112))
        .build()
        .unwrap();

        assert_eq!(entry.lines[0].memo.as_deref(), Some("Tax inclusive"));
        assert_eq!(entry.lines[0].tax_code.as_deref(), Some("VAT12"));
    }
}
