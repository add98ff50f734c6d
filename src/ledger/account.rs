//! Account registry: lookup, auto-provisioning, and soft-deactivation

use bigdecimal::BigDecimal;
use std::collections::HashMap;
use tracing::debug;

use crate::traits::*;
use crate::types::*;

/// Criteria for resolving an account before falling back to a default.
///
/// Resolution order: exact `code` match, then the first active account whose
/// name contains `name_contains` (case-insensitive, filtered by type when
/// given), then - only when no name fragment is requested - the first active
/// account of `account_type`. "First" means lowest code, so identical inputs
/// always resolve identically.
#[derive(Debug, Clone, Default)]
pub struct AccountSelector {
    pub code: Option<String>,
    pub name_contains: Option<String>,
    pub account_type: Option<AccountType>,
}

impl AccountSelector {
    /// Select by exact account code
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    /// Select the first active account of a type
    pub fn first_of_type(account_type: AccountType) -> Self {
        Self {
            account_type: Some(account_type),
            ..Default::default()
        }
    }

    /// Also match accounts whose name contains the given fragment
    pub fn or_name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    /// Restrict name-fragment matching to a single account type
    pub fn of_type(mut self, account_type: AccountType) -> Self {
        self.account_type = Some(account_type);
        self
    }
}

/// Fixed shape of a well-known account created when a lookup finds nothing
#[derive(Debug, Clone, Copy)]
pub struct DefaultAccountSpec {
    pub code: &'static str,
    pub name: &'static str,
    pub account_type: AccountType,
}

impl DefaultAccountSpec {
    fn to_account(self) -> Account {
        Account::new(
            self.code.to_string(),
            self.name.to_string(),
            self.account_type,
        )
    }
}

/// Well-known default accounts provisioned on demand by the document adapters
pub mod defaults {
    use super::DefaultAccountSpec;
    use crate::types::AccountType;

    pub const CASH: DefaultAccountSpec = DefaultAccountSpec {
        code: "1000",
        name: "Cash",
        account_type: AccountType::Asset,
    };

    pub const ACCOUNTS_RECEIVABLE: DefaultAccountSpec = DefaultAccountSpec {
        code: "1100",
        name: "Accounts Receivable",
        account_type: AccountType::Asset,
    };

    pub const ACCOUNTS_PAYABLE: DefaultAccountSpec = DefaultAccountSpec {
        code: "2000",
        name: "Accounts Payable",
        account_type: AccountType::Liability,
    };

    pub const SALES_REVENUE: DefaultAccountSpec = DefaultAccountSpec {
        code: "4000",
        name: "Sales Revenue",
        account_type: AccountType::Revenue,
    };

    pub const GENERAL_EXPENSE: DefaultAccountSpec = DefaultAccountSpec {
        code: "5000",
        name: "General Expense",
        account_type: AccountType::Expense,
    };
}

/// Account registry for chart-of-accounts operations
pub struct AccountRegistry<S: LedgerStore> {
    pub(crate) store: S,
}

impl<S: LedgerStore> AccountRegistry<S> {
    /// Create a new account registry
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a new account explicitly; a duplicate code is a validation error
    pub async fn create_account(
        &mut self,
        code: String,
        name: String,
        account_type: AccountType,
    ) -> LedgerResult<Account> {
        crate::utils::validation::validate_account_code(&code)?;
        crate::utils::validation::validate_account_name(&name)?;

        let account = Account::new(code, name, account_type);
        match self.store.insert_account(&account).await {
            Ok(()) => Ok(account),
            Err(LedgerError::AccountCodeConflict(code)) => Err(LedgerError::Validation(format!(
                "account with code '{code}' already exists"
            ))),
            Err(e) => Err(e),
        }
    }

    /// Get an account by code
    pub async fn get_account(&self, code: &str) -> LedgerResult<Option<Account>> {
        self.store.get_account(code).await
    }

    /// Get an account by code, returning an error if not found
    pub async fn get_required(&self, code: &str) -> LedgerResult<Account> {
        self.store
            .get_account(code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// List all accounts
    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        self.store.list_accounts(None).await
    }

    /// List accounts by type
    pub async fn list_accounts_by_type(
        &self,
        account_type: AccountType,
    ) -> LedgerResult<Vec<Account>> {
        self.store.list_accounts(Some(account_type)).await
    }

    /// Soft-deactivate an account. Accounts referenced by posted lines are
    /// never deleted; a deactivated account is skipped by lookups.
    pub async fn deactivate(&mut self, code: &str) -> LedgerResult<Account> {
        let mut account = self.get_required(code).await?;
        account.active = false;
        account.updated_at = chrono::Utc::now().naive_utc();
        self.store.update_account(&account).await?;
        Ok(account)
    }

    /// Current balance of an account
    pub async fn get_balance(&self, code: &str) -> LedgerResult<BigDecimal> {
        Ok(self.get_required(code).await?.balance)
    }

    /// Resolve an account by selector, creating the well-known default when
    /// nothing matches.
    ///
    /// Two concurrent callers can both miss the lookup and race on the
    /// default's insert; the unique code constraint makes exactly one of them
    /// win, and the loser re-fetches the now-existing row.
    pub async fn find_or_create(
        &mut self,
        selector: AccountSelector,
        default: &DefaultAccountSpec,
    ) -> LedgerResult<Account> {
        if let Some(found) = self.resolve(&selector).await? {
            return Ok(found);
        }

        let account = default.to_account();
        match self.store.insert_account(&account).await {
            Ok(()) => {
                debug!(code = %account.code, name = %account.name, "provisioned default account");
                Ok(account)
            }
            Err(LedgerError::AccountCodeConflict(_)) => {
                // Lost the creation race; the row exists now.
                self.get_required(default.code).await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve(&self, selector: &AccountSelector) -> LedgerResult<Option<Account>> {
        if let Some(code) = &selector.code {
            if let Some(account) = self.store.get_account(code).await? {
                if account.active {
                    return Ok(Some(account));
                }
            }
        }

        if let Some(fragment) = &selector.name_contains {
            let fragment = fragment.to_lowercase();
            let candidates = self.store.list_accounts(selector.account_type).await?;
            return Ok(candidates
                .into_iter()
                .find(|a| a.active && a.name.to_lowercase().contains(&fragment)));
        }

        if let Some(account_type) = selector.account_type {
            let candidates = self.store.list_accounts(Some(account_type)).await?;
            return Ok(candidates.into_iter().find(|a| a.active));
        }

        Ok(None)
    }
}

/// Utility functions for working with accounts
pub mod utils {
    use super::*;

    /// Provision the well-known default chart used by the document adapters
    pub async fn create_default_chart<S: LedgerStore>(
        registry: &mut AccountRegistry<S>,
    ) -> LedgerResult<HashMap<String, Account>> {
        let specs = [
            ("cash", defaults::CASH),
            ("accounts_receivable", defaults::ACCOUNTS_RECEIVABLE),
            ("accounts_payable", defaults::ACCOUNTS_PAYABLE),
            ("sales_revenue", defaults::SALES_REVENUE),
            ("general_expense", defaults::GENERAL_EXPENSE),
        ];

        let mut accounts = HashMap::new();
        for (key, spec) in specs {
            let account = registry
                .find_or_create(AccountSelector::code(spec.code), &spec)
                .await?;
            accounts.insert(key.to_string(), account);
        }
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;

    #[tokio::test]
    async fn test_find_or_create_is_deterministic_on_empty_registry() {
        for _ in 0..2 {
            let mut registry = AccountRegistry::new(MemoryStore::new());
            let account = registry
                .find_or_create(
                    AccountSelector::code("1100")
                        .or_name_contains("Receivable")
                        .of_type(AccountType::Asset),
                    &defaults::ACCOUNTS_RECEIVABLE,
                )
                .await
                .unwrap();

            assert_eq!(account.code, "1100");
            assert_eq!(account.name, "Accounts Receivable");
            assert_eq!(account.account_type, AccountType::Asset);
            assert_eq!(account.balance, BigDecimal::from(0));
        }
    }

    #[tokio::test]
    async fn test_find_or_create_prefers_existing_by_name_fragment() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        registry
            .create_account(
                "1150".to_string(),
                "Trade Receivables".to_string(),
                AccountType::Asset,
            )
            .await
            .unwrap();

        let account = registry
            .find_or_create(
                AccountSelector::code("1100")
                    .or_name_contains("Receivable")
                    .of_type(AccountType::Asset),
                &defaults::ACCOUNTS_RECEIVABLE,
            )
            .await
            .unwrap();

        assert_eq!(account.code, "1150");
    }

    #[tokio::test]
    async fn test_find_or_create_skips_inactive_accounts() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        registry
            .create_account(
                "4100".to_string(),
                "Service Revenue".to_string(),
                AccountType::Revenue,
            )
            .await
            .unwrap();
        registry.deactivate("4100").await.unwrap();

        let account = registry
            .find_or_create(
                AccountSelector::first_of_type(AccountType::Revenue),
                &defaults::SALES_REVENUE,
            )
            .await
            .unwrap();

        assert_eq!(account.code, "4000");
    }

    #[tokio::test]
    async fn test_creation_race_recovers_existing_row() {
        let store = MemoryStore::new();
        let mut first = AccountRegistry::new(store.clone());
        let mut second = AccountRegistry::new(store);

        let a = first
            .find_or_create(
                AccountSelector::code("2000"),
                &defaults::ACCOUNTS_PAYABLE,
            )
            .await
            .unwrap();
        // Second registry reaches insert_account with the row already present.
        let b = second
            .find_or_create(
                AccountSelector::default(),
                &defaults::ACCOUNTS_PAYABLE,
            )
            .await
            .unwrap();

        assert_eq!(a.code, b.code);
        assert_eq!(a.name, b.name);
    }

    #[tokio::test]
    async fn test_duplicate_explicit_create_is_rejected() {
        let mut registry = AccountRegistry::new(MemoryStore::new());
        registry
            .create_account("1000".to_string(), "Cash".to_string(), AccountType::Asset)
            .await
            .unwrap();

        let result = registry
            .create_account(
                "1000".to_string(),
                "Petty Cash".to_string(),
                AccountType::Asset,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_required_missing_account() {
        let registry = AccountRegistry::new(MemoryStore::new());
        let result = registry.get_required("9999").await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(code)) if code == "9999"));
    }
}
