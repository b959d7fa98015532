//! # Chunked Data Parallelism
//!
//! Work is split into fixed index ranges so that results never depend on
//! scheduling. With the ``rayon`` feature the ranges run on a thread pool,
//! otherwise sequentially.

use core::ops::Range;

use crate::errors::{ShortlistError, ShortlistResult};

/// Sentences per work unit.
pub const DEFAULT_CHUNK_SIZE: usize = 2048;

/// Split `0..n` into contiguous ranges of at most `chunk` items.
pub fn chunk_ranges(n: usize, chunk: usize) -> Vec<Range<usize>> {
    let chunk = chunk.max(1);
    (0..n).step_by(chunk).map(|lo| lo..(lo + chunk).min(n)).collect()
}

/// Run `f` inside a pool with `n_threads` workers (0 picks the default).
#[cfg(feature = "rayon")]
pub fn with_threads<R, F>(n_threads: usize, f: F) -> ShortlistResult<R>
where
    R: Send,
    F: FnOnce() -> ShortlistResult<R> + Send,
{
    if n_threads == 0 {
        return f();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build()
        .map_err(|e| ShortlistError::InvalidConfig(format!("thread pool: {e}")))?;
    pool.install(f)
}

#[cfg(not(feature = "rayon"))]
pub fn with_threads<R, F>(n_threads: usize, f: F) -> ShortlistResult<R>
where
    F: FnOnce() -> ShortlistResult<R>,
{
    if n_threads > 1 {
        log::debug!("built without rayon; ignoring n_threads={n_threads}");
    }
    f()
}

/// Map every chunk of `0..n` and fold the results with `reduce`.
///
/// `reduce` must be associative and commutative; the first error aborts.
#[cfg(feature = "rayon")]
pub fn map_reduce<T, M, R>(n: usize, chunk: usize, map: M, reduce: R) -> ShortlistResult<T>
where
    T: Send + Default,
    M: Fn(Range<usize>) -> ShortlistResult<T> + Sync + Send,
    R: Fn(T, T) -> ShortlistResult<T> + Sync + Send,
{
    use rayon::prelude::*;

    chunk_ranges(n, chunk)
        .into_par_iter()
        .map(map)
        .try_reduce(T::default, reduce)
}

#[cfg(not(feature = "rayon"))]
pub fn map_reduce<T, M, R>(n: usize, chunk: usize, map: M, reduce: R) -> ShortlistResult<T>
where
    T: Default,
    M: Fn(Range<usize>) -> ShortlistResult<T>,
    R: Fn(T, T) -> ShortlistResult<T>,
{
    let mut acc = T::default();
    for r in chunk_ranges(n, chunk) {
        acc = reduce(acc, map(r)?)?;
    }
    Ok(acc)
}

/// Map every index of `0..n`, keeping index order in the output.
#[cfg(feature = "rayon")]
pub fn map_collect<T, M>(n: usize, chunk: usize, map: M) -> Vec<T>
where
    T: Send,
    M: Fn(usize) -> T + Sync + Send,
{
    use rayon::prelude::*;

    (0..n).into_par_iter().with_min_len(chunk.max(1)).map(map).collect()
}

#[cfg(not(feature = "rayon"))]
pub fn map_collect<T, M>(n: usize, _chunk: usize, map: M) -> Vec<T>
where
    M: Fn(usize) -> T,
{
    (0..n).map(map).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_cover_everything_once() {
        let r = chunk_ranges(10, 4);
        assert_eq!(r, vec![0..4, 4..8, 8..10]);
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(3, 0), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn reduce_sums_independent_of_threads() {
        let sum = |n_threads| {
            with_threads(n_threads, || {
                map_reduce(1000, 7, |r| Ok(r.map(|i| i as u64).sum::<u64>()), |a, b| Ok(a + b))
            })
            .unwrap()
        };
        assert_eq!(sum(1), 499_500);
        assert_eq!(sum(4), 499_500);
    }

    #[test]
    fn reduce_propagates_errors() {
        let res: ShortlistResult<u64> = map_reduce(
            100,
            10,
            |r| {
                if r.contains(&55) {
                    Err(ShortlistError::EmptyCorpus)
                } else {
                    Ok(1)
                }
            },
            |a, b| Ok(a + b),
        );
        assert!(res.is_err());
    }

    #[test]
    fn collect_keeps_order() {
        let v = map_collect(50, 3, |i| i * 2);
        assert_eq!(v, (0..50).map(|i| i * 2).collect::<Vec<_>>());
    }
}
