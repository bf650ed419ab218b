//! Fork-join parallel loops for one fragment.
//!
//! [`ParallelEngine`] owns a dedicated rayon pool and offers the loop shapes
//! the propagation core needs: over a vertex range, over the members of a
//! frontier restricted to a range, and over a batch of messages. Callbacks
//! receive the index of the worker running them, which selects the worker's
//! own outbound channel. Every element is visited exactly once; no order is
//! guaranteed between elements.
//!
//! Ranges shorter than the configured threshold run inline on the calling
//! thread as worker 0.

use rayon::prelude::*;

use crate::config::ParallelConfig;
use crate::error::Result;
use crate::fragment::{Vertex, VertexRange};
use crate::frontier::DenseVertexSet;

/// Vertices handed to a worker per rayon split.
const MIN_VERTICES_PER_TASK: usize = 64;

/// Frontier words handed to a worker per rayon split.
const MIN_WORDS_PER_TASK: usize = 4;

/// Per-fragment worker pool.
#[derive(Debug)]
pub struct ParallelEngine {
    pool: rayon::ThreadPool,
    thread_num: usize,
    parallel_threshold: usize,
}

impl ParallelEngine {
    /// Builds the pool described by `config`.
    pub fn new(config: &ParallelConfig) -> Result<Self> {
        let thread_num = config.threads.effective_threads().max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_num)
            .thread_name(|i| format!("shardwcc-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            thread_num,
            parallel_threshold: config.parallel_threshold,
        })
    }

    /// Number of workers; worker indices are `0..thread_num`.
    #[must_use]
    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    fn should_parallelize(&self, len: usize) -> bool {
        self.thread_num > 1 && len >= self.parallel_threshold
    }

    /// Calls `f(tid, v)` for every vertex of `range`.
    pub fn for_each<F>(&self, range: VertexRange, f: F)
    where
        F: Fn(usize, Vertex) + Send + Sync,
    {
        if !self.should_parallelize(range.len()) {
            range.iter().for_each(|v| f(0, v));
            return;
        }
        self.pool.install(|| {
            (range.begin()..range.end())
                .into_par_iter()
                .with_min_len(MIN_VERTICES_PER_TASK)
                .for_each(|i| f(worker_index(), Vertex::new(i)));
        });
    }

    /// Calls `f(tid, v)` for every member of `set` inside `range`.
    ///
    /// Work is split by bitset word, so cost tracks the range size in words
    /// plus the number of members, not the number of edges.
    pub fn for_each_in<F>(&self, set: &DenseVertexSet, range: VertexRange, f: F)
    where
        F: Fn(usize, Vertex) + Send + Sync,
    {
        if !self.should_parallelize(range.len()) {
            set.iter_range(range).for_each(|v| f(0, v));
            return;
        }
        self.pool.install(|| {
            set.word_span(range)
                .into_par_iter()
                .with_min_len(MIN_WORDS_PER_TASK)
                .for_each(|w| {
                    let tid = worker_index();
                    for v in set.members_in_word(w, range) {
                        f(tid, v);
                    }
                });
        });
    }

    /// Calls `f(tid, item)` for every item, stopping at the first error.
    pub fn for_each_message<T, F>(&self, items: &[T], f: F) -> Result<()>
    where
        T: Sync,
        F: Fn(usize, &T) -> Result<()> + Send + Sync,
    {
        if !self.should_parallelize(items.len()) {
            return items.iter().try_for_each(|item| f(0, item));
        }
        self.pool.install(|| {
            items
                .par_iter()
                .with_min_len(MIN_VERTICES_PER_TASK)
                .try_for_each(|item| f(worker_index(), item))
        })
    }

    /// Empties `set` using the pool.
    pub fn clear(&self, set: &DenseVertexSet) {
        if self.should_parallelize(set.capacity()) {
            self.pool.install(|| set.par_clear());
        } else {
            set.clear();
        }
    }
}

/// Index of the pool worker running the current closure.
fn worker_index() -> usize {
    rayon::current_thread_index().unwrap_or(0)
}
