//! Random Source
//!
//! Every random decision (weighted line choice, alternation spans, deletion
//! delays) goes through [`RandomSource`] so tests can script the outcome.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;

/// Source of uniform random integers
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`. Callers never pass `len == 0`.
    fn pick(&self, len: usize) -> usize;

    /// Uniform integer in `low..=high`
    fn between(&self, low: u64, high: u64) -> u64;
}

/// Thread-local RNG backed source used in production
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        rand::thread_rng().gen_range(low..=high)
    }
}

/// Replays a fixed sequence of values, cycling when exhausted.
///
/// `pick` reduces each value modulo `len`; `between` clamps it into range.
#[derive(Debug)]
pub struct ScriptedRandom {
    script: Vec<usize>,
    queue: Mutex<VecDeque<usize>>,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = usize>) -> Self {
        let script: Vec<usize> = values.into_iter().collect();
        let queue = Mutex::new(script.iter().copied().collect());
        Self { script, queue }
    }

    /// Always returns the first candidate / the lower bound
    pub fn first() -> Self {
        Self::new([0])
    }

    fn next_value(&self) -> usize {
        let mut queue = self.queue.lock();
        if queue.is_empty() {
            queue.extend(self.script.iter().copied());
        }
        queue.pop_front().unwrap_or(0)
    }
}

impl RandomSource for ScriptedRandom {
    fn pick(&self, len: usize) -> usize {
        self.next_value() % len.max(1)
    }

    fn between(&self, low: u64, high: u64) -> u64 {
        (low + self.next_value() as u64).min(high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_stays_in_range() {
        let rng = ThreadRandom;
        for _ in 0..1000 {
            assert!(rng.pick(3) < 3);
            let v = rng.between(1, 5);
            assert!((1..=5).contains(&v));
        }
    }

    #[test]
    fn test_scripted_random_cycles() {
        let rng = ScriptedRandom::new([1, 4]);
        assert_eq!(rng.pick(3), 1);
        assert_eq!(rng.pick(3), 1); // 4 % 3
        assert_eq!(rng.pick(10), 1);
        assert_eq!(rng.between(1, 5), 5); // 1 + 4
    }

    #[test]
    fn test_scripted_between_clamps() {
        let rng = ScriptedRandom::new([99]);
        assert_eq!(rng.between(1, 5), 5);
    }
}
