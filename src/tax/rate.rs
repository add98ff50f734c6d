//! Flat-rate tax calculation: percentage and fixed-amount rates, inclusive or
//! exclusive, with effectiveness windows and per-scope defaults

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::traits::LedgerStore;
use crate::types::{round2, LedgerError, LedgerResult};

/// How a tax rate derives its amount from a subtotal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxRateKind {
    /// A percentage of the subtotal
    Percentage,
    /// A fixed amount, independent of the subtotal
    Fixed,
}

/// Which document flows a tax rate applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxScope {
    Sales,
    Purchases,
    All,
}

/// A tax rate definition.
///
/// Pure function object: given a subtotal it deterministically yields a tax
/// amount and a total, and carries no mutable ledger state. Effectiveness is a
/// query-time gate ([`TaxRateManager::effective`]); the math itself never
/// refuses to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    /// Unique rate code (e.g. "VAT12")
    pub code: String,
    /// Human-readable name
    pub name: String,
    pub kind: TaxRateKind,
    /// Percentage points for `Percentage` rates (e.g. 12 for 12%)
    pub rate: BigDecimal,
    /// Amount for `Fixed` rates
    pub fixed_amount: BigDecimal,
    /// Whether stated totals already embed this tax
    pub is_inclusive: bool,
    pub applies_to: TaxScope,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
    /// At most one default per scope; maintained by the store on save
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl TaxRate {
    /// Create a percentage rate (tax-exclusive, sales scope)
    pub fn percentage(code: String, name: String, rate: BigDecimal) -> Self {
        Self {
            code,
            name,
            kind: TaxRateKind::Percentage,
            rate,
            fixed_amount: BigDecimal::from(0),
            is_inclusive: false,
            applies_to: TaxScope::Sales,
            effective_from: None,
            effective_to: None,
            is_default: false,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Create a fixed-amount rate (tax-exclusive, sales scope)
    pub fn fixed(code: String, name: String, amount: BigDecimal) -> Self {
        Self {
            code,
            name,
            kind: TaxRateKind::Fixed,
            rate: BigDecimal::from(0),
            fixed_amount: amount,
            is_inclusive: false,
            applies_to: TaxScope::Sales,
            effective_from: None,
            effective_to: None,
            is_default: false,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Mark stated totals as already containing this tax
    pub fn inclusive(mut self) -> Self {
        self.is_inclusive = true;
        self
    }

    /// Restrict the rate to a scope
    pub fn scoped_to(mut self, scope: TaxScope) -> Self {
        self.applies_to = scope;
        self
    }

    /// Limit the rate to an effectiveness window (either bound optional)
    pub fn effective_between(
        mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Self {
        self.effective_from = from;
        self.effective_to = to;
        self
    }

    /// Flag as the default rate for its scope
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Validate the rate definition
    pub fn validate(&self) -> LedgerResult<()> {
        if self.code.trim().is_empty() {
            return Err(LedgerError::Validation(
                "tax rate code cannot be empty".to_string(),
            ));
        }
        match self.kind {
            TaxRateKind::Percentage if self.rate < BigDecimal::from(0) => Err(
                LedgerError::Validation("tax percentage cannot be negative".to_string()),
            ),
            TaxRateKind::Fixed if self.fixed_amount < BigDecimal::from(0) => Err(
                LedgerError::Validation("fixed tax amount cannot be negative".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Tax amount for a subtotal. Percentage mode rounds to the cent; fixed
    /// mode returns the fixed amount verbatim. A negative or zero subtotal
    /// computes normally.
    pub fn calculate_tax(&self, subtotal: &BigDecimal) -> BigDecimal {
        match self.kind {
            TaxRateKind::Percentage => round2(&(subtotal * &self.rate / BigDecimal::from(100))),
            TaxRateKind::Fixed => round2(&self.fixed_amount),
        }
    }

    /// Total for a subtotal: unchanged when the tax is inclusive, otherwise
    /// subtotal plus tax.
    pub fn calculate_total(&self, subtotal: &BigDecimal) -> BigDecimal {
        if self.is_inclusive {
            round2(subtotal)
        } else {
            round2(&(subtotal + self.calculate_tax(subtotal)))
        }
    }

    /// Inverse of [`TaxRate::calculate_total`], within rounding tolerance
    pub fn subtotal_from_total(&self, total: &BigDecimal) -> BigDecimal {
        if self.is_inclusive {
            return round2(total);
        }
        match self.kind {
            TaxRateKind::Fixed => round2(&(total - &self.fixed_amount)),
            TaxRateKind::Percentage => {
                let divisor = BigDecimal::from(100) + &self.rate;
                round2(&(total * BigDecimal::from(100) / divisor))
            }
        }
    }

    /// Tax portion embedded in a tax-inclusive total (reverse calculation).
    /// For exclusive rates this is simply the tax on the subtotal.
    pub fn included_tax(&self, total: &BigDecimal) -> BigDecimal {
        if !self.is_inclusive {
            return self.calculate_tax(total);
        }
        match self.kind {
            TaxRateKind::Fixed => round2(&self.fixed_amount),
            TaxRateKind::Percentage => {
                let divisor = BigDecimal::from(100) + &self.rate;
                let base = total * BigDecimal::from(100) / divisor;
                round2(&(total - base))
            }
        }
    }

    /// Whether the rate may be used on the given date
    pub fn is_effective(&self, today: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.effective_from {
            if from > today {
                return false;
            }
        }
        if let Some(to) = self.effective_to {
            if to < today {
                return false;
            }
        }
        true
    }
}

/// Storage-backed manager enforcing the effectiveness gate and per-scope
/// default uniqueness.
pub struct TaxRateManager<S: LedgerStore> {
    store: S,
}

impl<S: LedgerStore> TaxRateManager<S> {
    /// Create a new tax rate manager
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Save a rate. When it is flagged as default, prior defaults for the
    /// same scope are unset inside the same atomic store operation.
    pub async fn save(&mut self, rate: &TaxRate) -> LedgerResult<()> {
        rate.validate()?;
        self.store.save_tax_rate(rate).await
    }

    /// Get a rate by code
    pub async fn get(&self, code: &str) -> LedgerResult<TaxRate> {
        self.store
            .get_tax_rate(code)
            .await?
            .ok_or_else(|| LedgerError::TaxRateNotFound(code.to_string()))
    }

    /// Get a rate by code, rejecting rates outside their effectiveness
    /// window. This is the gate callers use before invoking the math.
    pub async fn effective(&self, code: &str, today: NaiveDate) -> LedgerResult<TaxRate> {
        let rate = self.get(code).await?;
        if !rate.is_effective(today) {
            return Err(LedgerError::TaxRateNotEffective(rate.code));
        }
        Ok(rate)
    }

    /// The effective default rate for a scope, if one exists
    pub async fn default_for(
        &self,
        scope: TaxScope,
        today: NaiveDate,
    ) -> LedgerResult<Option<TaxRate>> {
        let rates = self.store.list_tax_rates(Some(scope)).await?;
        Ok(rates
            .into_iter()
            .find(|r| r.is_default && r.is_effective(today)))
    }

    /// List rates, optionally filtered by scope
    pub async fn list(&self, scope: Option<TaxScope>) -> LedgerResult<Vec<TaxRate>> {
        self.store.list_tax_rates(scope).await
    }
}
