//! Synthetic mempools for exercising the selectors.
//!
//! Generated pools mix ordinary items with "family clusters": a low-rate
//! parent followed by a high-rate child, the situation in which
//! [GreedySelector](crate::selector::GreedySelector) loses fees.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, LogNormal};
use thiserror::Error;

use crate::item::{Item, ItemId};

/// Shape and scale of the gamma distribution item weights are drawn from.
const WEIGHT_GAMMA: (f64, f64) = (2.0, 200.0);
const MIN_WEIGHT: u64 = 200;
const MAX_WEIGHT: u64 = 400_000;

/// Mean and standard deviation of the log-normal distribution ordinary fee
/// rates are drawn from.
const FEE_RATE_LOG_NORMAL: (f64, f64) = (2.0, 1.0);

/// Fee rates forced onto the two halves of a family cluster.
const PARENT_RATE: u64 = 1;
const CHILD_RATE: u64 = 50;

/// Items whose rate is below this are candidates for [inject_whale].
const WHALE_PARENT_MAX_RATE: f64 = 2.0;
const WHALE_FEE: u64 = 5_000_000;
const WHALE_WEIGHT: u64 = 5_000;

/// Builds a [Mempool].
#[derive(Debug, Clone)]
pub struct MempoolBuilder {
    size: usize,
    seed: Option<u64>,
    whale_probability: f64,
    max_parent_distance: usize,
}

#[derive(Debug, Error)]
pub enum MempoolBuildError {
    #[error("mempool size must be greater than 0")]
    ZeroSize,
    #[error("probability {0} is not in the range 0.0..=1.0")]
    BadProbability(f64),
    #[error("parent distance must be greater than 0")]
    ZeroParentDistance,
    #[error("invalid weight distribution: {0}")]
    Weight(#[from] rand_distr::GammaError),
    #[error("invalid fee rate distribution: {0}")]
    FeeRate(#[from] rand_distr::NormalError),
}

impl Default for MempoolBuilder {
    fn default() -> Self {
        MempoolBuilder {
            size: 2000,
            seed: None,
            whale_probability: 0.05,
            max_parent_distance: 50,
        }
    }
}

impl MempoolBuilder {
    /// Creates a new [MempoolBuilder].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of items to generate (default 2000).
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;

        self
    }

    /// Makes generation reproducible. Without a seed, each [Mempool] is
    /// seeded from system entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);

        self
    }

    /// Probability that an item becomes the high-rate child of an earlier,
    /// low-rate item (default 0.05).
    pub fn whale_probability(mut self, probability: f64) -> Self {
        self.whale_probability = probability;

        self
    }

    /// Children pick their parent among this many preceding items (default
    /// 50).
    pub fn max_parent_distance(mut self, distance: usize) -> Self {
        self.max_parent_distance = distance;

        self
    }

    pub fn build(self) -> Result<Mempool, MempoolBuildError> {
        use MempoolBuildError::*;

        let MempoolBuilder {
            size,
            seed,
            whale_probability,
            max_parent_distance,
        } = self;

        if size == 0 {
            return Err(ZeroSize);
        }
        if whale_probability.is_nan() || !(0.0..=1.0).contains(&whale_probability)
        {
            return Err(BadProbability(whale_probability));
        }
        if max_parent_distance == 0 {
            return Err(ZeroParentDistance);
        }

        Ok(Mempool {
            size,
            seed,
            whale_probability,
            max_parent_distance,
            weights: Gamma::new(WEIGHT_GAMMA.0, WEIGHT_GAMMA.1)?,
            fee_rates: LogNormal::new(
                FEE_RATE_LOG_NORMAL.0,
                FEE_RATE_LOG_NORMAL.1,
            )?,
        })
    }
}

/// A validated mempool configuration.
#[derive(Debug, Clone)]
pub struct Mempool {
    size: usize,
    seed: Option<u64>,
    whale_probability: f64,
    max_parent_distance: usize,
    weights: Gamma<f64>,
    fee_rates: LogNormal<f64>,
}

impl Mempool {
    pub fn builder() -> MempoolBuilder {
        MempoolBuilder::new()
    }

    /// Generates a pool of items. Every parent reference points at an
    /// earlier item, so the pool is acyclic.
    pub fn generate(&self) -> Vec<Item> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        self.generate_with(&mut rng)
    }

    /// Equivalent to [Mempool::generate] using the given source of
    /// randomness.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Item> {
        let mut items: Vec<Item> = (0..self.size)
            .map(|_| {
                let weight = self.weights.sample(rng) as u64;
                Item::new(random_id(rng), weight.clamp(MIN_WEIGHT, MAX_WEIGHT), 0)
            })
            .collect();

        for i in 0..items.len() {
            if i > 0 && rng.gen_bool(self.whale_probability) {
                let parent = i - rng.gen_range(1..=i.min(self.max_parent_distance));

                items[parent].fee = items[parent].weight * PARENT_RATE;
                let parent_id = items[parent].id.clone();

                let child = &mut items[i];
                child.parents.insert(parent_id);
                child.fee = child.weight * CHILD_RATE;
            } else {
                let rate = self.fee_rates.sample(rng);
                items[i].fee = (items[i].weight as f64 * rate) as u64;
            }
        }

        items
    }
}

/// Random 32-byte identifier, hex encoded.
fn random_id<R: Rng + ?Sized>(rng: &mut R) -> ItemId {
    let bytes: [u8; 32] = rng.gen();

    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .into()
}

/// Appends a very high-fee child of a randomly chosen low-rate item to
/// `items`, returning the ID of the new item. Any item may be chosen as the
/// parent when none has a rate below 2.0. Returns `None` if `items` is empty.
pub fn inject_whale<R: Rng + ?Sized>(
    items: &mut Vec<Item>,
    rng: &mut R,
) -> Option<ItemId> {
    let low_rate: Vec<&Item> = items
        .iter()
        .filter(|item| item.rate() < WHALE_PARENT_MAX_RATE)
        .collect();

    let parent = match low_rate.choose(rng) {
        Some(item) => item.id.clone(),
        None => items.choose(rng)?.id.clone(),
    };

    let mut id: ItemId = format!("WHALE_{}", rng.gen_range(1000..10000)).into();
    while items.iter().any(|item| item.id == id) {
        id = format!("{}_{}", id, items.len()).into();
    }

    items.push(
        Item::new(id.clone(), WHALE_WEIGHT, WHALE_FEE).with_parents([parent]),
    );

    Some(id)
}

/// Returns the items whose fee rate is at least `threshold`.
pub fn filter_dust(items: &[Item], threshold: f64) -> Vec<Item> {
    items
        .iter()
        .filter(|item| item.rate() >= threshold)
        .cloned()
        .collect()
}
