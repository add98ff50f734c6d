//! Core types and data structures for the ledger posting engine

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// All monetary values carry two fraction digits. Comparisons and persisted
/// balances go through [`round2`], never float equality.
pub const MONEY_SCALE: i64 = 2;

/// Round a monetary amount to the ledger's fixed scale (half-up).
pub fn round2(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

/// Compare two monetary amounts at the ledger's fixed scale.
pub fn money_eq(a: &BigDecimal, b: &BigDecimal) -> bool {
    round2(a) == round2(b)
}

/// Account types following standard accounting principles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Assets - what the business owns (Cash, Receivables, Equipment, etc.)
    Asset,
    /// Liabilities - what the business owes (Loans, Accounts Payable, etc.)
    Liability,
    /// Equity - owner's interest in the business
    Equity,
    /// Revenue - money earned by the business
    Revenue,
    /// Expenses - costs incurred by the business
    Expense,
}

impl AccountType {
    /// Returns the normal balance side for this account type.
    /// Assets and Expenses normally carry debit balances;
    /// Liabilities, Equity, and Revenue normally carry credit balances.
    pub fn normal_balance(&self) -> BalanceSide {
        match self {
            AccountType::Asset | AccountType::Expense => BalanceSide::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                BalanceSide::Credit
            }
        }
    }
}

/// The two sides of double-entry bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceSide {
    /// Debit side - increases Assets and Expenses
    Debit,
    /// Credit side - increases Liabilities, Equity, and Revenue
    Credit,
}

/// A ledger account with a denormalized running balance.
///
/// `balance` is a materialized view over every posted line effect since the
/// account was created; it is only ever written through the posting commit,
/// guarded by `version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account code (e.g. "1000")
    pub code: String,
    /// Human-readable account name
    pub name: String,
    /// Type of account (Asset, Liability, etc.)
    pub account_type: AccountType,
    /// Current running balance, expressed on the account's normal side
    pub balance: BigDecimal,
    /// Soft-deactivation flag; referenced accounts are never deleted
    pub active: bool,
    /// Optimistic-concurrency token, bumped on every balance write
    pub version: u64,
    /// When the account was created
    pub created_at: NaiveDateTime,
    /// When the account was last updated
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new account with a zero balance
    pub fn new(code: String, name: String, account_type: AccountType) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            code,
            name,
            account_type,
            balance: BigDecimal::from(0),
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compute the balance this account would have after a line effect.
    ///
    /// For a debit-normal account the new balance is `balance + debit - credit`;
    /// for a credit-normal account it is `balance + credit - debit`. Pure -
    /// the stored balance is only mutated by the posting commit.
    pub fn apply_effect(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        let delta = match self.account_type.normal_balance() {
            BalanceSide::Debit => debit - credit,
            BalanceSide::Credit => credit - debit,
        };
        round2(&(&self.balance + delta))
    }
}

/// Lifecycle of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Entry is being drafted and may still be edited
    Draft,
    /// Entry has been posted to the ledger and is immutable
    Posted,
    /// Entry has been reversed by a later entry
    Reversed,
}

/// A single line within a journal entry.
///
/// `account_code` and `account_name` are denormalized at line-creation time so
/// historical entries display correctly even if the account is later renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Code of the account this line affects
    pub account_code: String,
    /// Account name captured when the line was created
    pub account_name: String,
    /// Debit amount (>= 0)
    pub debit: BigDecimal,
    /// Credit amount (>= 0); net effect of the line is `debit - credit`
    pub credit: BigDecimal,
    /// Optional memo for this specific line
    pub memo: Option<String>,
    /// Optional tax rate label attached to this line
    pub tax_code: Option<String>,
}

impl JournalLine {
    /// Create a debit line against an account
    pub fn debit(account: &Account, amount: BigDecimal) -> Self {
        Self {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            debit: round2(&amount),
            credit: BigDecimal::from(0),
            memo: None,
            tax_code: None,
        }
    }

    /// Create a credit line against an account
    pub fn credit(account: &Account, amount: BigDecimal) -> Self {
        Self {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            debit: BigDecimal::from(0),
            credit: round2(&amount),
            memo: None,
            tax_code: None,
        }
    }

    /// Attach a memo to the line
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Attach a tax rate label to the line
    pub fn with_tax_code(mut self, tax_code: impl Into<String>) -> Self {
        self.tax_code = Some(tax_code.into());
        self
    }
}

/// A journal entry header owning an ordered set of lines.
///
/// Once posted, the entry is immutable except for a future reversal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier for the entry
    pub id: Uuid,
    /// Unique, human-readable reference (e.g. "JE-2024-0001")
    pub reference: String,
    /// Date the entry takes effect
    pub date: NaiveDate,
    /// Description of the entry
    pub description: String,
    /// Current lifecycle status
    pub status: EntryStatus,
    /// Lines that make up this entry, in insertion order
    pub lines: Vec<JournalLine>,
    /// When the entry was posted; set exactly once
    pub posted_at: Option<NaiveDateTime>,
    /// Actor that posted the entry; set exactly once
    pub posted_by: Option<String>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// When the entry was created
    pub created_at: NaiveDateTime,
    /// When the entry was last updated
    pub updated_at: NaiveDateTime,
}

impl JournalEntry {
    /// Create a new draft entry with no lines
    pub fn new(reference: String, date: NaiveDate, description: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            reference,
            date,
            description,
            status: EntryStatus::Draft,
            lines: Vec::new(),
            posted_at: None,
            posted_by: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a line to the entry. Rejected unless the entry is still a draft.
    pub fn add_line(&mut self, line: JournalLine) -> LedgerResult<()> {
        if self.status != EntryStatus::Draft {
            return Err(LedgerError::InvalidEntry(format!(
                "journal entry '{}' is {:?} and can no longer be modified",
                self.reference, self.status
            )));
        }
        self.lines.push(line);
        self.updated_at = chrono::Utc::now().naive_utc();
        Ok(())
    }

    /// Sum of all debit amounts
    pub fn total_debits(&self) -> BigDecimal {
        round2(&self.lines.iter().map(|l| &l.debit).sum())
    }

    /// Sum of all credit amounts
    pub fn total_credits(&self) -> BigDecimal {
        round2(&self.lines.iter().map(|l| &l.credit).sum())
    }

    /// Whether debits equal credits at two decimal places
    pub fn is_balanced(&self) -> bool {
        money_eq(&self.total_debits(), &self.total_credits())
    }

    /// Validate the entry for posting: at least two lines, non-negative
    /// amounts, and balanced to the cent.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.lines.len() < 2 {
            return Err(LedgerError::InvalidEntry(
                "journal entry must have at least two lines for double-entry bookkeeping"
                    .to_string(),
            ));
        }

        for line in &self.lines {
            if line.debit < BigDecimal::from(0) || line.credit < BigDecimal::from(0) {
                return Err(LedgerError::InvalidEntry(format!(
                    "line against account '{}' carries a negative amount",
                    line.account_code
                )));
            }
        }

        if !self.is_balanced() {
            return Err(LedgerError::ImbalancedEntry {
                reference: self.reference.clone(),
                debits: self.total_debits(),
                credits: self.total_credits(),
            });
        }

        Ok(())
    }
}

/// Kinds of source documents that can originate a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Invoice,
    Expense,
    Manual,
}

/// Lifecycle of a source document, independent of the journal entry's status
/// but synchronized to `Posted` at posting time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Draft,
    Submitted,
    Approved,
    Posted,
    Rejected,
}

/// Ledger-side projection of a source document.
///
/// `journal_entry_id` is a weak back-reference: the document looks up its
/// entry by id, the journal aggregate knows nothing about the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub reference: String,
    pub status: DocumentStatus,
    pub journal_entry_id: Option<Uuid>,
}

impl DocumentRecord {
    pub fn new(id: Uuid, kind: DocumentKind, reference: String, status: DocumentStatus) -> Self {
        Self {
            id,
            kind,
            reference,
            status,
            journal_entry_id: None,
        }
    }
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid journal entry: {0}")]
    InvalidEntry(String),
    #[error("journal entry '{reference}' is not balanced: debits = {debits}, credits = {credits}")]
    ImbalancedEntry {
        reference: String,
        debits: BigDecimal,
        credits: BigDecimal,
    },
    #[error("journal entry '{0}' has already been posted")]
    AlreadyPosted(String),
    #[error("journal entry not found: {0}")]
    EntryNotFound(String),
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("account code already exists: {0}")]
    AccountCodeConflict(String),
    #[error("stale balance for account '{account_code}': expected version {expected}, found {found}")]
    VersionConflict {
        account_code: String,
        expected: u64,
        found: u64,
    },
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("approval limit exceeded: amount {required} is above the approver's limit {limit}")]
    InsufficientAuthority {
        required: BigDecimal,
        limit: BigDecimal,
    },
    #[error("tax rate not found: {0}")]
    TaxRateNotFound(String),
    #[error("tax rate '{0}' is not effective")]
    TaxRateNotEffective(String),
    #[error("validation error: {0}")]
    Validation(String),
}

impl LedgerError {
    /// Whether the caller may safely retry the failed operation.
    /// Version conflicts are transient; everything else is a hard rejection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::VersionConflict { .. })
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
