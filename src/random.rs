use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Randomness capability injected into the engine.
///
/// `next_index(bound)` must return an index in `[0, bound)`. The engine calls
/// it while choosing initial centroids and when reseeding empty clusters, and
/// never keeps any random state of its own.
///
/// Any `FnMut(usize) -> usize` closure is an `IndexSource`, which makes
/// scripted sequences easy to pass in tests:
///
/// ```
/// use lloyd_kmeans::IndexSource;
///
/// let mut next = 0;
/// let mut source = move |_bound: usize| {
///     let index = next;
///     next += 1;
///     index
/// };
/// assert_eq!(source.next_index(10), 0);
/// assert_eq!(source.next_index(10), 1);
/// ```
pub trait IndexSource: Send {
    fn next_index(&mut self, bound: usize) -> usize;
}

impl<F> IndexSource for F
where
    F: FnMut(usize) -> usize + Send,
{
    fn next_index(&mut self, bound: usize) -> usize {
        self(bound)
    }
}

/// Uniform index source backed by a seeded ChaCha8 generator
#[derive(Debug, Clone)]
pub struct SeededIndexSource {
    rng: ChaCha8Rng,
}

impl SeededIndexSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl IndexSource for SeededIndexSource {
    fn next_index(&mut self, bound: usize) -> usize {
        self.rng.gen_range(0..bound)
    }
}
