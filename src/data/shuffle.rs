// ============================================================
// Layer 4 — Shuffle Buffer
// ============================================================
// Reorders an unbounded stream using a fixed-size reservoir.
//
// How it works (capacity B):
//   1. Fill the reservoir with the first B elements
//   2. For every further element: pick a random resident,
//      emit it, and put the new element in its slot
//   3. When the input runs dry, drain the residents in
//      random order
//
// This is NOT a uniform shuffle of the whole stream. An element
// can only move about B positions away from where it arrived,
// so the output is a locally windowed permutation. For large
// streams with a generous B that is good enough to break up
// ordering in the source; for exact shuffles, materialise the
// data and use SliceRandom::shuffle instead.
//
// Errors from upstream are returned immediately rather than
// being held in the reservoir.
//
// Uses a seeded StdRng so runs are reproducible.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::PipelineError;

/// Windowed shuffle over an iterator of `Result<T, PipelineError>`.
pub struct ShuffleBuffer<I, T> {
    upstream:      I,
    reservoir:     Vec<T>,
    capacity:      usize,
    rng:           StdRng,
    upstream_done: bool,
}

impl<I, T> ShuffleBuffer<I, T>
where
    I: Iterator<Item = Result<T, PipelineError>>,
{
    /// # Errors
    /// `InvalidConfig` if `capacity` is zero.
    pub fn new(upstream: I, capacity: usize, seed: u64) -> Result<Self, PipelineError> {
        if capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "shuffle buffer capacity must be at least 1".into(),
            ));
        }
        Ok(Self {
            upstream,
            reservoir: Vec::with_capacity(capacity),
            capacity,
            rng: StdRng::seed_from_u64(seed),
            upstream_done: false,
        })
    }

    /// Number of elements currently held
    pub fn resident(&self) -> usize {
        self.reservoir.len()
    }
}

impl<I, T> Iterator for ShuffleBuffer<I, T>
where
    I: Iterator<Item = Result<T, PipelineError>>,
{
    type Item = Result<T, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.upstream_done {
            // ── Fill phase ────────────────────────────────────────────────────
            while self.reservoir.len() < self.capacity {
                match self.upstream.next() {
                    Some(Ok(item)) => self.reservoir.push(item),
                    Some(Err(e))   => return Some(Err(e)),
                    None => {
                        self.upstream_done = true;
                        break;
                    }
                }
            }

            // ── Steady state: swap one in, one out ────────────────────────────
            if !self.upstream_done {
                match self.upstream.next() {
                    Some(Ok(item)) => {
                        let slot = self.rng.gen_range(0..self.reservoir.len());
                        let out  = std::mem::replace(&mut self.reservoir[slot], item);
                        return Some(Ok(out));
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    None => self.upstream_done = true,
                }
            }
        }

        // ── Drain phase ───────────────────────────────────────────────────────
        if self.reservoir.is_empty() {
            return None;
        }
        let slot = self.rng.gen_range(0..self.reservoir.len());
        Some(Ok(self.reservoir.swap_remove(slot)))
    }
}
