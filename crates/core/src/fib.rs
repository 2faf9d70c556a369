//! The placeholder CPU-bound workload: naive recursive Fibonacci.

/// Highest index the submission gateway admits. Anything above this is
/// rejected before any side effect runs; anything at or below it is
/// computed in full, however long that takes.
pub const MAX_INDEX: i64 = 40;

/// Strategy seam for the workload, so the pipeline never depends on the
/// naive recursion directly.
pub trait FibSolver: Send + Sync {
  fn compute(&self, n: i64) -> u64;
}

/// Deliberately exponential-time recursion: `fib(n) = 1` for n < 2,
/// otherwise `fib(n-1) + fib(n-2)`. Negative indices fall into the
/// base case and yield 1.
pub struct NaiveRecursive;

impl FibSolver for NaiveRecursive {
  fn compute(&self, n: i64) -> u64 {
    if n < 2 {
      1
    } else {
      self.compute(n - 1) + self.compute(n - 2)
    }
  }
}
