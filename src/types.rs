use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SyncError};

/// Card identifier, opaque to the engine (e.g. `"card-a"`).
pub type ItemId = String;

/// Which copy of a card a counter refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardVariant {
    Normal,
    Foil,
}

impl CardVariant {
    pub fn from_foil(is_foil: bool) -> Self {
        if is_foil {
            CardVariant::Foil
        } else {
            CardVariant::Normal
        }
    }
}

/// Ownership counts for one card.
///
/// The wire form is `{"normal": n, "foil": f}`; `normalCount` / `foilCount`
/// are accepted on input as well. A missing counter reads as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    #[serde(rename = "normal", alias = "normalCount", default)]
    pub normal_count: u32,
    #[serde(rename = "foil", alias = "foilCount", default)]
    pub foil_count: u32,
}

impl CollectionRecord {
    pub fn new(normal_count: u32, foil_count: u32) -> Self {
        Self {
            normal_count,
            foil_count,
        }
    }

    pub fn count(&self, variant: CardVariant) -> u32 {
        match variant {
            CardVariant::Normal => self.normal_count,
            CardVariant::Foil => self.foil_count,
        }
    }

    fn count_mut(&mut self, variant: CardVariant) -> &mut u32 {
        match variant {
            CardVariant::Normal => &mut self.normal_count,
            CardVariant::Foil => &mut self.foil_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.normal_count == 0 && self.foil_count == 0
    }

    pub fn total(&self) -> u64 {
        self.normal_count as u64 + self.foil_count as u64
    }
}

/// Mapping from item id to ownership counts.
///
/// Never holds a record whose counters are both zero: decrementing to zero
/// removes the entry and deserialization drops such entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HashMap<ItemId, CollectionRecord>")]
pub struct Collection(HashMap<ItemId, CollectionRecord>);

impl From<HashMap<ItemId, CollectionRecord>> for Collection {
    fn from(mut records: HashMap<ItemId, CollectionRecord>) -> Self {
        records.retain(|_, record| !record.is_empty());
        Collection(records)
    }
}

impl FromIterator<(ItemId, CollectionRecord)> for Collection {
    fn from_iter<I: IntoIterator<Item = (ItemId, CollectionRecord)>>(iter: I) -> Self {
        Collection::from(iter.into_iter().collect::<HashMap<_, _>>())
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a serialized collection.
    ///
    /// A blank payload is an empty collection. Anything that is not a JSON
    /// object of records is reported as [`SyncError::MalformedPayload`].
    pub fn from_json(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Ok(Collection::new());
        }
        serde_json::from_str(payload).map_err(|e| SyncError::MalformedPayload(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, item_id: &str) -> Option<&CollectionRecord> {
        self.0.get(item_id)
    }

    pub fn quantity(&self, item_id: &str, variant: CardVariant) -> u32 {
        self.0
            .get(item_id)
            .map(|record| record.count(variant))
            .unwrap_or(0)
    }

    /// Add one copy, creating the record if needed. Returns the new count.
    pub fn increment(&mut self, item_id: &str, variant: CardVariant) -> u32 {
        let record = self.0.entry(item_id.to_string()).or_default();
        let count = record.count_mut(variant);
        *count = count.saturating_add(1);
        *count
    }

    /// Remove one copy, floored at zero, dropping the record once both
    /// counters are zero. Returns `None` when the item was absent.
    pub fn decrement(&mut self, item_id: &str, variant: CardVariant) -> Option<u32> {
        let record = self.0.get_mut(item_id)?;
        let count = record.count_mut(variant);
        *count = count.saturating_sub(1);
        let remaining = *count;
        if record.is_empty() {
            self.0.remove(item_id);
        }
        Some(remaining)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &CollectionRecord)> {
        self.0.iter()
    }

    pub fn stats(&self) -> CollectionStats {
        let mut stats = CollectionStats {
            unique_cards: self.0.len(),
            ..CollectionStats::default()
        };
        for record in self.0.values() {
            stats.total_cards += record.total();
            stats.foil_cards += record.foil_count as u64;
        }
        stats
    }
}

/// Aggregate counts over a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    pub total_cards: u64,
    pub unique_cards: usize,
    pub foil_cards: u64,
}
