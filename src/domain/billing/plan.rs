//! Plan tier definitions.
//!
//! Represents the subscription plan levels offered on AEOBRO.

use serde::{Deserialize, Serialize};

/// Subscription plan tier.
///
/// Determines what a user is entitled to publish. Every account starts
/// on `Lite`; paid tiers are assigned by reconciling payment provider
/// events against the configured price mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    /// Free tier. The default for every account.
    Lite,
    /// Entry paid tier.
    Plus,
    /// Professional tier.
    Pro,
    /// Business tier for organizations.
    Business,
    /// Enterprise tier, custom pricing.
    Enterprise,
}

impl Plan {
    /// Returns true if this plan is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Lite)
    }

    /// Returns the storage/display form of this plan.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Lite => "LITE",
            Plan::Plus => "PLUS",
            Plan::Pro => "PRO",
            Plan::Business => "BUSINESS",
            Plan::Enterprise => "ENTERPRISE",
        }
    }

    /// Parses a plan from its storage form.
    ///
    /// Returns `None` for unrecognized values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LITE" => Some(Plan::Lite),
            "PLUS" => Some(Plan::Plus),
            "PRO" => Some(Plan::Pro),
            "BUSINESS" => Some(Plan::Business),
            "ENTERPRISE" => Some(Plan::Enterprise),
            _ => None,
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::Lite
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
