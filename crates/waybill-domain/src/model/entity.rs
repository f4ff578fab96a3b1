//! Entity abbreviation summaries

use serde::{Deserialize, Serialize};
use waybill_types::ValidationError;

use crate::service::allocation::{round0, round2};

/// Sub-shipment wrapper found on a consignee name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "index")]
pub enum Tag {
    Split(u32),
    Payload(u32),
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Split(n) => write!(f, "split-{}", n),
            Tag::Payload(n) => write!(f, "payload-{}", n),
        }
    }
}

/// Grouping key derived from a consignee display name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityKey {
    pub abbreviation: String,
    pub tag: Option<Tag>,
}

/// Derive the entity abbreviation for a consignee display name.
///
/// `"ABC - Store 12"` keys as `ABC`; a name without `" - "` keys as itself.
/// `"split-2(ABC - Store 12)"` keys as `split-2(ABC)` and carries the tag.
pub fn entity_abbreviation(name: &str) -> EntityKey {
    let name = name.trim();
    match parse_wrapper(name) {
        Some((tag, inner)) => EntityKey {
            abbreviation: format!("{}({})", tag, prefix_of(inner)),
            tag: Some(tag),
        },
        None => EntityKey {
            abbreviation: prefix_of(name).to_string(),
            tag: None,
        },
    }
}

fn prefix_of(name: &str) -> &str {
    match name.find(" - ") {
        Some(idx) => name[..idx].trim(),
        None => name.trim(),
    }
}

fn parse_wrapper(name: &str) -> Option<(Tag, &str)> {
    let open = name.find('(')?;
    let inner = name[open + 1..].strip_suffix(')')?;
    let head = name[..open].trim().to_lowercase();
    let (kind, index) = head.split_once('-')?;
    let index: u32 = index.trim().parse().ok()?;
    let tag = match kind.trim() {
        "split" => Tag::Split(index),
        "payload" => Tag::Payload(index),
        _ => return None,
    };
    Some((tag, inner.trim()))
}

/// Whether an entity's totals follow the drops or are pinned by the user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Calculated,
    Rounded,
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityStatus::Calculated => write!(f, "calculated"),
            EntityStatus::Rounded => write!(f, "rounded"),
        }
    }
}

/// Per-entity totals for one waybill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummary {
    pub entity_abbreviation: String,
    pub total_amount: f64,
    pub total_percentage: f64,
    #[serde(default)]
    pub status: EntityStatus,
}

impl EntitySummary {
    pub fn new(entity_abbreviation: impl Into<String>) -> Self {
        Self {
            entity_abbreviation: entity_abbreviation.into(),
            total_amount: 0.0,
            total_percentage: 0.0,
            status: EntityStatus::Calculated,
        }
    }

    pub fn is_rounded(&self) -> bool {
        self.status == EntityStatus::Rounded
    }

    /// Pin the entity at a whole-number percentage.
    ///
    /// The amount scales with the percentage, whatever the amount mode that
    /// produced it. Once rounded the summary is skipped by automatic
    /// aggregation until [`EntitySummary::reset`].
    pub fn round(&mut self) -> Result<(), ValidationError> {
        if self.is_rounded() {
            return Err(self.transition_error("round"));
        }
        let rounded = round0(self.total_percentage);
        if self.total_percentage > 0.0 {
            self.total_amount = round2(self.total_amount * rounded / self.total_percentage);
        }
        self.total_percentage = rounded;
        self.status = EntityStatus::Rounded;
        Ok(())
    }

    /// Release a pinned entity so automatic aggregation applies again
    pub fn reset(&mut self) -> Result<(), ValidationError> {
        if !self.is_rounded() {
            return Err(self.transition_error("reset"));
        }
        self.status = EntityStatus::Calculated;
        Ok(())
    }

    fn transition_error(&self, action: &str) -> ValidationError {
        ValidationError::InvalidTransition {
            entity: self.entity_abbreviation.clone(),
            status: self.status.to_string(),
            action: action.to_string(),
        }
    }
}
