//! Chronological train/test split.

/// Share of rows (percent) used for training.
pub const TRAIN_PERCENT: usize = 85;

/// Number of leading rows that go to training: `floor(0.85 * n)`.
///
/// Integer arithmetic, so the boundary never depends on float rounding.
pub fn chronological_split_index(n: usize) -> usize {
    n * TRAIN_PERCENT / 100
}

/// Split date-sorted rows into `(train, test)` without shuffling.
pub fn split_rows<T>(rows: &[T]) -> (&[T], &[T]) {
    rows.split_at(chronological_split_index(rows.len()))
}
