// ============================================================
// Layer 4 — Train/Validation/Test Splitter
// ============================================================
// Seeded shuffle of a dataset index followed by a three-way
// split. The same seed always yields the same split, so split
// files can be regenerated reproducibly.
//
// Split ratio: train_fraction / val_fraction / remainder to test.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// The three partitions produced by [`split_train_val_test`].
#[derive(Debug, Clone, PartialEq)]
pub struct Splits<T> {
    pub train: Vec<T>,
    pub val:   Vec<T>,
    pub test:  Vec<T>,
}

/// Shuffle `samples` with `seed` and split into (train, val, test).
///
/// # Example
/// ```ignore
/// let s = split_train_val_test(records, 0.8, 0.1, 42);
/// // 80% train, 10% val, 10% test
/// ```
pub fn split_train_val_test<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    val_fraction:   f64,
    seed:           u64,
) -> Splits<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total     = samples.len();
    let train_end = ((total as f64) * train_fraction).round() as usize;
    let train_end = train_end.min(total);
    let val_end   = train_end + ((total as f64) * val_fraction).round() as usize;
    let val_end   = val_end.min(total);

    // split_off(n) leaves [0..n) behind and returns [n..)
    let test  = samples.split_off(val_end);
    let val   = samples.split_off(train_end);
    let train = samples;

    tracing::debug!(
        "Dataset split: {} train, {} validation, {} test",
        train.len(),
        val.len(),
        test.len(),
    );

    Splits { train, val, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let s = split_train_val_test(items, 0.8, 0.1, 7);
        assert_eq!(s.train.len(), 80);
        assert_eq!(s.val.len(), 10);
        assert_eq!(s.test.len(), 10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let s = split_train_val_test(items, 0.7, 0.2, 1);
        let mut all: Vec<usize> = s.train.into_iter().chain(s.val).chain(s.test).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val_test((0..30).collect::<Vec<usize>>(), 0.6, 0.2, 42);
        let b = split_train_val_test((0..30).collect::<Vec<usize>>(), 0.6, 0.2, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let s = split_train_val_test(Vec::<usize>::new(), 0.8, 0.1, 0);
        assert!(s.train.is_empty() && s.val.is_empty() && s.test.is_empty());
    }

    #[test]
    fn test_fractions_over_one_are_clamped() {
        let s = split_train_val_test((0..10).collect::<Vec<usize>>(), 1.0, 0.5, 3);
        assert_eq!(s.train.len(), 10);
        assert!(s.val.is_empty());
        assert!(s.test.is_empty());
    }
}
