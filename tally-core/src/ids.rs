use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a location row in the master-data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

/// Identity of a financial-year row in the master-data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinancialYearId(pub i64);

impl LocationId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl FinancialYearId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for LocationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<i64> for FinancialYearId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location#{}", self.0)
    }
}

impl fmt::Display for FinancialYearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "financial-year#{}", self.0)
    }
}
