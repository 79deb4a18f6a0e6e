//! Pending work items and their fee rates.

use std::{borrow::Borrow, cmp::Ordering, collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Globally unique identifier of an [`Item`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId(value.to_owned())
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pending unit of work competing for space in a block.
///
/// `parents` may name items which are not part of the pool being mined. Such
/// references are treated as already satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Capacity units consumed by this item. Must be greater than 0.
    pub weight: u64,
    /// Revenue collected by mining this item, in the smallest currency unit.
    pub fee: u64,
    /// Items which must be mined before this one.
    #[serde(default)]
    pub parents: BTreeSet<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("item {0} has zero weight")]
    ZeroWeight(ItemId),
}

impl Item {
    /// Creates an item without any parents.
    pub fn new<I: Into<ItemId>>(id: I, weight: u64, fee: u64) -> Self {
        Item {
            id: id.into(),
            weight,
            fee,
            parents: BTreeSet::new(),
        }
    }

    /// Adds `parents` to the parent set of this item.
    pub fn with_parents<I, P>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ItemId>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));

        self
    }

    /// Fee per unit of weight, for display purposes. Use
    /// [`Item::fee_rate`] when comparing items.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.fee_rate().as_f64()
    }

    #[inline]
    pub fn fee_rate(&self) -> FeeRate {
        FeeRate::new(self.fee, self.weight)
    }

    pub fn validate(&self) -> Result<(), ItemError> {
        if self.weight == 0 {
            return Err(ItemError::ZeroWeight(self.id.clone()));
        }

        Ok(())
    }
}

/// Exact ratio of fee to weight.
///
/// Two rates are compared by cross-multiplication, so `1000/200` and `5/1`
/// compare as equal and no precision is lost to floating point.
#[derive(Debug, Clone, Copy)]
pub struct FeeRate {
    fee: u64,
    weight: u64,
}

impl FeeRate {
    pub fn new(fee: u64, weight: u64) -> Self {
        FeeRate { fee, weight }
    }

    pub fn as_f64(&self) -> f64 {
        if self.weight == 0 {
            return 0.0;
        }

        self.fee as f64 / self.weight as f64
    }
}

impl PartialEq for FeeRate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FeeRate {}

impl PartialOrd for FeeRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeeRate {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.fee as u128 * other.weight as u128;
        let rhs = other.fee as u128 * self.weight as u128;

        lhs.cmp(&rhs)
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_fee_per_weight() {
        let item = Item::new("a", 500, 25_000);

        assert_eq!(item.rate(), 50.0);
    }

    #[test]
    fn fee_rates_compare_exactly() {
        assert_eq!(FeeRate::new(1000, 200), FeeRate::new(5, 1));
        assert!(FeeRate::new(1, 3) < FeeRate::new(334, 1000));
        assert!(FeeRate::new(0, 10) < FeeRate::new(1, u64::MAX));
        assert!(FeeRate::new(u64::MAX, 1) > FeeRate::new(u64::MAX - 1, 1));
    }

    #[test]
    fn zero_weight_is_rejected() {
        let item = Item::new("empty", 0, 10);

        assert_eq!(item.validate(), Err(ItemError::ZeroWeight("empty".into())));
        assert!(Item::new("ok", 1, 0).validate().is_ok());
    }

    #[test]
    fn parents_deserialize_as_a_set() {
        let json = r#"{"id":"c","weight":10,"fee":5,"parents":["p","p","q"]}"#;
        let item: Item = serde_json::from_str(json).unwrap();

        assert_eq!(item.parents.len(), 2);
        assert!(item.parents.contains("p"));
    }

    #[test]
    fn negative_fee_does_not_deserialize() {
        let json = r#"{"id":"c","weight":10,"fee":-5}"#;

        assert!(serde_json::from_str::<Item>(json).is_err());
    }
}
