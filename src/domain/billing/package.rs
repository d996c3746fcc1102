//! Billing package definitions.
//!
//! A package is what a user subscribes to: a price plus a billing interval.
//! Feature gating per package is owned by the platform, not this service.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::PackageId;

/// Billing interval of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingInterval {
    /// Length of one billing period in days.
    pub fn period_days(&self) -> i64 {
        match self {
            BillingInterval::Monthly => 30,
            BillingInterval::Quarterly => 90,
            BillingInterval::Yearly => 365,
        }
    }

    /// Returns the display name for this interval.
    pub fn display_name(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "Monthly",
            BillingInterval::Quarterly => "Quarterly",
            BillingInterval::Yearly => "Yearly",
        }
    }
}

impl std::fmt::Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A subscribable package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPackage {
    /// Package identifier.
    pub id: PackageId,

    /// Human-readable package name.
    pub name: String,

    /// Price in the smallest currency unit (IDR has no minor unit).
    pub price: i64,

    /// Billing interval, determines the subscription period length.
    pub interval: BillingInterval,
}

impl BillingPackage {
    /// Price formatted the way the gateway serializes gross amounts:
    /// a decimal string with two fraction digits, e.g. `"10000.00"`.
    ///
    /// Signatures are computed over this string form, so it must match the
    /// gateway byte-for-byte. Never round-trip through a float.
    pub fn gross_amount_string(&self) -> String {
        format!("{}.00", self.price)
    }
}
