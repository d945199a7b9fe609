use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Padding width used by every transactional document family.
pub const TRANSACTION_WIDTH: usize = 6;
/// Padding width used by raw-material and finished-product codes.
pub const PRODUCT_WIDTH: usize = 4;
/// Padding width used by ledger codes.
pub const LEDGER_WIDTH: usize = 5;

/// Settings key holding the stock-adjustment type prefix.
pub const STOCK_ADJUSTMENT_PREFIX_KEY: &str = "StockAdjustmentTransactionPrefix";

/// Document or master-data family that owns an independent numbering sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFamily {
    Purchase,
    PurchaseReturn,
    KitchenIssue,
    KitchenProduction,
    Order,
    Sale,
    SaleReturn,
    StockTransfer,
    Accounting,
    RawMaterial,
    FinishedProduct,
    Ledger,
}

/// Which references partition a family's sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoping {
    /// Own location plus financial year.
    LocationAndYear,
    /// Financial year only; the prefix carries the primary location.
    YearOnly,
    /// One sequence across every record of the family.
    Global,
}

/// Ordering used to pick the most recent record of a scope.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recency {
    /// Latest creation time, ties broken by identity.
    CreatedAt,
    /// Highest identity value.
    Identity,
}

/// Static numbering rules of a [`CodeFamily`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FamilyConfig {
    pub scoping: Scoping,
    pub padding_width: usize,
    pub prefix_key: &'static str,
    pub recency: Recency,
}

impl FamilyConfig {
    const fn transactional(scoping: Scoping, prefix_key: &'static str) -> Self {
        Self {
            scoping,
            padding_width: TRANSACTION_WIDTH,
            prefix_key,
            recency: Recency::CreatedAt,
        }
    }

    const fn master(padding_width: usize, prefix_key: &'static str) -> Self {
        Self {
            scoping: Scoping::Global,
            padding_width,
            prefix_key,
            recency: Recency::Identity,
        }
    }

    pub fn needs_location(&self) -> bool {
        matches!(self.scoping, Scoping::LocationAndYear)
    }

    pub fn needs_financial_year(&self) -> bool {
        !matches!(self.scoping, Scoping::Global)
    }
}

impl CodeFamily {
    pub const ALL: [CodeFamily; 12] = [
        CodeFamily::Purchase,
        CodeFamily::PurchaseReturn,
        CodeFamily::KitchenIssue,
        CodeFamily::KitchenProduction,
        CodeFamily::Order,
        CodeFamily::Sale,
        CodeFamily::SaleReturn,
        CodeFamily::StockTransfer,
        CodeFamily::Accounting,
        CodeFamily::RawMaterial,
        CodeFamily::FinishedProduct,
        CodeFamily::Ledger,
    ];

    pub const fn config(self) -> FamilyConfig {
        match self {
            CodeFamily::Sale => {
                FamilyConfig::transactional(Scoping::LocationAndYear, "SaleTransactionPrefix")
            }
            CodeFamily::SaleReturn => {
                FamilyConfig::transactional(Scoping::LocationAndYear, "SaleReturnTransactionPrefix")
            }
            CodeFamily::StockTransfer => FamilyConfig::transactional(
                Scoping::LocationAndYear,
                "StockTransferTransactionPrefix",
            ),
            CodeFamily::Order => {
                FamilyConfig::transactional(Scoping::LocationAndYear, "OrderTransactionPrefix")
            }
            CodeFamily::Purchase => {
                FamilyConfig::transactional(Scoping::YearOnly, "PurchaseTransactionPrefix")
            }
            CodeFamily::PurchaseReturn => {
                FamilyConfig::transactional(Scoping::YearOnly, "PurchaseReturnTransactionPrefix")
            }
            CodeFamily::KitchenIssue => {
                FamilyConfig::transactional(Scoping::YearOnly, "KitchenIssueTransactionPrefix")
            }
            CodeFamily::KitchenProduction => FamilyConfig::transactional(
                Scoping::YearOnly,
                "KitchenProductionTransactionPrefix",
            ),
            CodeFamily::Accounting => {
                FamilyConfig::transactional(Scoping::YearOnly, "AccountingTransactionPrefix")
            }
            CodeFamily::RawMaterial => FamilyConfig::master(PRODUCT_WIDTH, "RawMaterialCodePrefix"),
            CodeFamily::FinishedProduct => {
                FamilyConfig::master(PRODUCT_WIDTH, "FinishedProductCodePrefix")
            }
            CodeFamily::Ledger => FamilyConfig::master(LEDGER_WIDTH, "LedgerCodePrefix"),
        }
    }

    pub fn is_master_data(self) -> bool {
        matches!(self.config().scoping, Scoping::Global)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CodeFamily::Purchase => "purchase",
            CodeFamily::PurchaseReturn => "purchase_return",
            CodeFamily::KitchenIssue => "kitchen_issue",
            CodeFamily::KitchenProduction => "kitchen_production",
            CodeFamily::Order => "order",
            CodeFamily::Sale => "sale",
            CodeFamily::SaleReturn => "sale_return",
            CodeFamily::StockTransfer => "stock_transfer",
            CodeFamily::Accounting => "accounting",
            CodeFamily::RawMaterial => "raw_material",
            CodeFamily::FinishedProduct => "finished_product",
            CodeFamily::Ledger => "ledger",
        }
    }
}

impl fmt::Display for CodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CodeFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| format!("unknown code family: {s}"))
    }
}
