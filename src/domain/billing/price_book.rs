//! Price-to-plan resolution.
//!
//! Maps the payment provider's price identifiers to internal plan tiers.
//! The mapping is built once at startup from configuration and injected
//! wherever resolution is needed.

use std::collections::HashMap;

use super::plan::Plan;

/// Result of resolving a provider price id.
///
/// Resolution never fails: an id the book does not know resolves to
/// `Unmapped`, and handlers keep the user's existing plan in that case.
/// A misconfigured price table therefore cannot downgrade anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanResolution {
    /// The price id mapped to a plan tier.
    Plan(Plan),
    /// The price id was empty, absent, or not in the book.
    Unmapped,
}

impl PlanResolution {
    /// Returns the resolved plan, if any.
    pub fn plan(&self) -> Option<Plan> {
        match self {
            PlanResolution::Plan(plan) => Some(*plan),
            PlanResolution::Unmapped => None,
        }
    }
}

/// Immutable mapping from provider price ids to plan tiers.
#[derive(Debug, Clone)]
pub struct PriceBook {
    entries: HashMap<String, Plan>,
}

impl PriceBook {
    /// Builds a price book from (price id, plan) pairs.
    ///
    /// Empty price ids are skipped; they could otherwise make a missing
    /// id on an event resolve to a real plan.
    pub fn new(entries: impl IntoIterator<Item = (String, Plan)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .filter(|(price_id, _)| !price_id.is_empty())
                .collect(),
        }
    }

    /// Resolves a provider price id to a plan tier.
    pub fn resolve(&self, price_id: Option<&str>) -> PlanResolution {
        match price_id {
            Some(id) if !id.is_empty() => match self.entries.get(id) {
                Some(plan) => PlanResolution::Plan(*plan),
                None => PlanResolution::Unmapped,
            },
            _ => PlanResolution::Unmapped,
        }
    }

    /// Number of price mappings in the book.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the book has no mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
