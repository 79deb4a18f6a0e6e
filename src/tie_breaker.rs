//! Utilities for describing how selectors order candidates with equal fee
//! rates.

use std::cmp::Ordering;

use crate::item::{FeeRate, ItemId};

/// Breaks ties between candidates with the same fee rate. Every variant is a
/// total order over candidates from one pool, so selections never depend on
/// hash or iteration order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TieBreaker {
    /// Prefer the lexicographically smallest item ID.
    #[default]
    LowestId,
    /// Prefer the candidate with the smallest weight, falling back to
    /// [TieBreaker::LowestId].
    SmallestWeight,
    /// Prefer the candidate whose item appeared first in the input.
    InputOrder,
}

/// The attributes of a candidate that tie-breaking looks at. For a package
/// these describe the item whose ancestors make up the package, with the
/// weight of the whole package.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub id: &'a ItemId,
    pub rate: FeeRate,
    pub weight: u64,
    pub index: usize,
}

impl TieBreaker {
    /// Compares two candidates with equal rates. [Ordering::Less] means `a`
    /// is preferred.
    pub fn prefer(&self, a: &Candidate, b: &Candidate) -> Ordering {
        match self {
            Self::LowestId => a.id.cmp(b.id),
            Self::SmallestWeight => {
                a.weight.cmp(&b.weight).then_with(|| a.id.cmp(b.id))
            }
            Self::InputOrder => a.index.cmp(&b.index),
        }
    }

    /// Orders candidates by descending rate, then by this tie-breaker.
    /// [Ordering::Less] means `a` is selected first.
    pub fn order(&self, a: &Candidate, b: &Candidate) -> Ordering {
        b.rate.cmp(&a.rate).then_with(|| self.prefer(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &ItemId, fee: u64, weight: u64, index: usize) -> Candidate {
        Candidate {
            id,
            rate: FeeRate::new(fee, weight),
            weight,
            index,
        }
    }

    #[test]
    fn higher_rate_always_wins() {
        let (a, b) = (ItemId::from("a"), ItemId::from("b"));
        let low = candidate(&a, 10, 10, 0);
        let high = candidate(&b, 30, 10, 1);

        for tb in [
            TieBreaker::LowestId,
            TieBreaker::SmallestWeight,
            TieBreaker::InputOrder,
        ] {
            assert_eq!(tb.order(&high, &low), Ordering::Less);
        }
    }

    #[test]
    fn equal_rates_use_tie_breaker() {
        let (a, b) = (ItemId::from("a"), ItemId::from("b"));
        let heavy = candidate(&a, 200, 200, 1);
        let light = candidate(&b, 100, 100, 0);

        assert_eq!(TieBreaker::LowestId.order(&heavy, &light), Ordering::Less);
        assert_eq!(
            TieBreaker::SmallestWeight.order(&light, &heavy),
            Ordering::Less
        );
        assert_eq!(TieBreaker::InputOrder.order(&light, &heavy), Ordering::Less);
    }
}
