//! Injectable random sources and the sampling helpers every engine component shares.
//!
//! Every stochastic operation in the engine takes `&mut impl RandomSource`.
//! Hosts that do not care about reproducibility pass [`DefaultSource`], a
//! handle onto one process-wide generator that is seeded from OS entropy on
//! first use and can be re-seeded per simulation run with [`reseed_default`].
//! Simulations own a [`SeededSource`] (or a whole [`RngBundle`]) per trial;
//! tests pin exact draws with [`ScriptedSource`].

use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::error::RegistryError;
use crate::numbers::{floor_f64_to_i64, i64_to_f64, round_to};

/// Largest representable draw strictly below 1.0.
const MAX_UNIT_DRAW: f64 = 1.0 - f64::EPSILON / 2.0;
const BUCKET_WEIGHT_TOLERANCE: f64 = 1e-6;
/// Absorbs division drift when counting decimal steps (`3.0 / 0.1 == 29.999...`).
const STEP_COUNT_EPSILON: f64 = 1e-9;

/// A "next float in [0,1)" generator plus the derived helpers built on it.
pub trait RandomSource {
    /// Next uniform draw in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// `true` iff the next draw is below `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Uniform integer in `[min, max]`, inclusive on both ends.
    fn random_int(&mut self, min: i64, max: i64) -> i64 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = i64_to_f64(hi.saturating_sub(lo).saturating_add(1));
        let offset = floor_f64_to_i64(self.next_unit() * span);
        lo.saturating_add(offset).clamp(lo, hi)
    }

    /// Uniform float in `[min, max)`.
    fn random_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_unit() * (max - min)
    }

    /// Uniformly pick one element, or `None` for an empty slice.
    fn random_pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        let last = i64::try_from(items.len() - 1).unwrap_or(i64::MAX);
        let idx = usize::try_from(self.random_int(0, last)).unwrap_or(0);
        items.get(idx)
    }

    /// One of `floor((max-min)/step)+1` equally likely values `min + k*step`.
    fn random_decimal(&mut self, min: f64, max: f64, step: f64) -> f64 {
        if step <= 0.0 || max <= min {
            return min;
        }
        let steps = ((max - min) / step + STEP_COUNT_EPSILON).floor() + 1.0;
        let k = (self.next_unit() * steps).floor().min(steps - 1.0);
        round_to(min + k * step, step_decimals(step))
    }

    /// Two-draw weighted bucket sample.
    ///
    /// The first draw selects a bucket by cumulative weight (the last bucket
    /// absorbs rounding shortfall); the second picks a uniform value inside it.
    /// The value is rounded to `precision` decimals and re-clamped into the
    /// bucket. An empty table samples as `0.0`.
    fn weighted_bucket_sample(&mut self, buckets: &[WeightedBucket], precision: u32) -> f64 {
        let Some(last) = buckets.last() else {
            return 0.0;
        };
        let roll = self.next_unit();
        let mut cumulative = 0.0;
        let bucket = buckets
            .iter()
            .find(|bucket| {
                cumulative += bucket.weight;
                roll < cumulative
            })
            .unwrap_or(last);
        let raw = bucket.min + self.next_unit() * (bucket.max - bucket.min);
        round_to(raw, precision).clamp(bucket.min, bucket.max)
    }
}

impl<S: RandomSource + ?Sized> RandomSource for &mut S {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

fn step_decimals(step: f64) -> u32 {
    (0..=9)
        .find(|decimals| {
            let scaled = step * 10_f64.powi(*decimals);
            (scaled - scaled.round()).abs() < STEP_COUNT_EPSILON
        })
        .map_or(9, |d| u32::try_from(d).unwrap_or(9))
}

/// `(min, max, weight)` triple used by [`RandomSource::weighted_bucket_sample`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedBucket {
    pub min: f64,
    pub max: f64,
    pub weight: f64,
}

impl WeightedBucket {
    #[must_use]
    pub const fn new(min: f64, max: f64, weight: f64) -> Self {
        Self { min, max, weight }
    }
}

/// Check that bucket weights sum to 1 and that no bucket range is inverted.
///
/// # Errors
///
/// Returns [`RegistryError::BucketWeights`] or [`RegistryError::InvertedRange`].
pub fn validate_buckets(buckets: &[WeightedBucket]) -> Result<(), RegistryError> {
    for bucket in buckets {
        if bucket.min > bucket.max {
            return Err(RegistryError::InvertedRange {
                field: String::from("bucket"),
                min: bucket.min,
                max: bucket.max,
            });
        }
    }
    let sum: f64 = buckets.iter().map(|bucket| bucket.weight).sum();
    if (sum - 1.0).abs() > BUCKET_WEIGHT_TOLERANCE {
        return Err(RegistryError::BucketWeights { sum });
    }
    Ok(())
}

/// Probability-weighted mean of a bucket table.
#[must_use]
pub fn bucket_expected_value(buckets: &[WeightedBucket]) -> f64 {
    buckets
        .iter()
        .map(|bucket| bucket.weight * (bucket.min + bucket.max) / 2.0)
        .sum()
}

/// Adapter turning any `rand` generator into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: RngCore> RngSource<R> {
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl<R: RngCore> CountingRng<R> {
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Seeded `SmallRng` stream with a draw counter.
#[derive(Debug, Clone)]
pub struct SeededSource {
    inner: CountingRng<SmallRng>,
}

impl SeededSource {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: CountingRng::new(SmallRng::seed_from_u64(seed)),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            inner: CountingRng::new(SmallRng::from_entropy()),
        }
    }

    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.inner.draws()
    }
}

impl RandomSource for SeededSource {
    fn next_unit(&mut self) -> f64 {
        self.inner.r#gen::<f64>()
    }
}

/// Replays a fixed list of draws, repeating the last one once exhausted.
///
/// Draws are clamped into `[0, 1)`; an empty script always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: VecDeque<f64>,
    last: f64,
    consumed: usize,
}

impl ScriptedSource {
    #[must_use]
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().map(clamp_unit).collect(),
            last: 0.0,
            consumed: 0,
        }
    }

    /// A source that returns `value` forever.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self {
            draws: VecDeque::new(),
            last: clamp_unit(value),
            consumed: 0,
        }
    }

    /// Number of draws handed out so far.
    #[must_use]
    pub const fn consumed(&self) -> usize {
        self.consumed
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        self.consumed += 1;
        if let Some(next) = self.draws.pop_front() {
            self.last = next;
        }
        self.last
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_UNIT_DRAW)
    } else {
        0.0
    }
}

/// Wraps any zero-argument closure as a [`RandomSource`].
pub struct FnSource<F>(pub F);

impl<F: FnMut() -> f64> RandomSource for FnSource<F> {
    fn next_unit(&mut self) -> f64 {
        clamp_unit((self.0)())
    }
}

static DEFAULT_SOURCE: OnceLock<Mutex<SeededSource>> = OnceLock::new();

fn default_cell() -> &'static Mutex<SeededSource> {
    DEFAULT_SOURCE.get_or_init(|| Mutex::new(SeededSource::from_entropy()))
}

/// Re-seed the process-wide default generator. Simulation drivers call this
/// once per run when they want [`DefaultSource`] itself to be reproducible.
pub fn reseed_default(seed: u64) {
    let mut guard = default_cell().lock().unwrap_or_else(PoisonError::into_inner);
    *guard = SeededSource::from_seed(seed);
}

/// Handle onto the process-wide default generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSource;

impl RandomSource for DefaultSource {
    fn next_unit(&mut self) -> f64 {
        default_cell()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_unit()
    }
}

/// Deterministic bundle of RNG streams segregated by simulation domain.
///
/// Each stream is derived from the user seed with a domain tag, so adding
/// draws to one domain never shifts the sequence another domain sees.
#[derive(Debug, Clone)]
pub struct RngBundle {
    battle: SeededSource,
    training: SeededSource,
    lifecycle: SeededSource,
    world: SeededSource,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            battle: SeededSource::from_seed(derive_stream_seed(seed, b"battle")),
            training: SeededSource::from_seed(derive_stream_seed(seed, b"training")),
            lifecycle: SeededSource::from_seed(derive_stream_seed(seed, b"lifecycle")),
            world: SeededSource::from_seed(derive_stream_seed(seed, b"world")),
        }
    }

    pub fn battle(&mut self) -> &mut SeededSource {
        &mut self.battle
    }

    pub fn training(&mut self) -> &mut SeededSource {
        &mut self.training
    }

    pub fn lifecycle(&mut self) -> &mut SeededSource {
        &mut self.lifecycle
    }

    pub fn world(&mut self) -> &mut SeededSource {
        &mut self.world
    }

    /// Total draws consumed across every stream.
    #[must_use]
    pub const fn total_draws(&self) -> u64 {
        self.battle.draws() + self.training.draws() + self.lifecycle.draws() + self.world.draws()
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
