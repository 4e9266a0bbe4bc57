use crate::constants::{ITEMSET_END, SEQUENCE_END};
use crate::error::{RadeBoundError, Result};

use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub type ItemId = i64;

/// One line of the dataset reduced to its item multiset.
///
/// Itemset boundaries are dropped; only how often each item occurs across the
/// whole sequence is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    /// item -> multiplicity (always >= 1)
    items: BTreeMap<ItemId, usize>,
    /// sum of multiplicities
    length: usize,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one dataset line. Sentinels and non-numeric tokens are skipped.
    pub fn parse_line(line: &str) -> Self {
        let mut transaction = Self::new();
        for token in line.split_whitespace() {
            let Ok(value) = token.parse::<ItemId>() else {
                continue;
            };
            if value == ITEMSET_END || value == SEQUENCE_END {
                continue;
            }
            transaction.add_item(value);
        }
        transaction
    }

    pub fn add_item(&mut self, item: ItemId) {
        *self.items.entry(item).or_insert(0) += 1;
        self.length += 1;
    }

    pub fn items(&self) -> &BTreeMap<ItemId, usize> {
        &self.items
    }

    pub fn multiplicity(&self, item: ItemId) -> usize {
        self.items.get(&item).copied().unwrap_or(0)
    }

    /// Item-length: total number of item occurrences.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Average and maximum transaction item-length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthProfile {
    pub average: f64,
    pub max: usize,
}

/// Parsed dataset together with the aggregates every later stage reads.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    transactions: Vec<Transaction>,
    /// item -> number of transactions containing it
    item_frequencies: BTreeMap<ItemId, u64>,
    /// item-length -> number of transactions with that length
    length_histogram: BTreeMap<usize, u64>,
    max_length: usize,
    item_range: Option<(ItemId, ItemId)>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a dataset file.
    ///
    /// # Errors
    /// Returns [`RadeBoundError::OpenDataset`] if the file cannot be opened and
    /// [`RadeBoundError::ReadDataset`] if reading fails midway.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| RadeBoundError::OpenDataset {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            RadeBoundError::Io(source) => RadeBoundError::ReadDataset {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Reads transactions line by line.
    ///
    /// Lines without any item (blank, or only sentinels) are skipped and do not
    /// count toward the dataset size N, wherever they appear in the input.
    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut dataset = Self::new();
        let mut buf = Vec::new();
        let mut skipped = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let transaction = Transaction::parse_line(&line);
            if transaction.is_empty() {
                skipped += 1;
                continue;
            }
            dataset.push(transaction);
        }

        debug!(
            "Parsed {} transactions ({} lines skipped), {} distinct items",
            dataset.len(),
            skipped,
            dataset.item_frequencies.len()
        );
        Ok(dataset)
    }

    /// Adds a transaction and updates the aggregates. Empty transactions are ignored.
    pub fn push(&mut self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }

        let length = transaction.len();
        self.max_length = self.max_length.max(length);
        *self.length_histogram.entry(length).or_insert(0) += 1;

        for &item in transaction.items().keys() {
            *self.item_frequencies.entry(item).or_insert(0) += 1;
            self.item_range = Some(match self.item_range {
                Some((lo, hi)) => (lo.min(item), hi.max(item)),
                None => (item, item),
            });
        }

        self.transactions.push(transaction);
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Dataset size N.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn item_frequencies(&self) -> &BTreeMap<ItemId, u64> {
        &self.item_frequencies
    }

    pub fn length_histogram(&self) -> &BTreeMap<usize, u64> {
        &self.length_histogram
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Smallest and largest item id, `None` for an empty dataset.
    pub fn item_range(&self) -> Option<(ItemId, ItemId)> {
        self.item_range
    }

    /// Number of transactions whose item-length is at least `threshold`.
    pub fn count_at_least(&self, threshold: usize) -> u64 {
        self.length_histogram
            .range(threshold..)
            .map(|(_, &count)| count)
            .sum()
    }

    pub fn length_profile(&self) -> Option<LengthProfile> {
        if self.is_empty() {
            return None;
        }
        let total: u64 = self
            .length_histogram
            .iter()
            .map(|(&length, &count)| length as u64 * count)
            .sum();
        Some(LengthProfile {
            average: total as f64 / self.len() as f64,
            max: self.max_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_counts_multiplicities() {
        let t = Transaction::parse_line("1 2 -1 1 3 -1 1 -1 -2\n");
        assert_eq!(t.multiplicity(1), 3);
        assert_eq!(t.multiplicity(2), 1);
        assert_eq!(t.multiplicity(3), 1);
        assert_eq!(t.multiplicity(-1), 0);
        assert_eq!(t.len(), 5);
        assert_eq!(t.items().len(), 3);
    }

    #[test]
    fn test_parse_line_skips_garbage_tokens() {
        let t = Transaction::parse_line("4 abc -1 4x 5 -1 -2");
        assert_eq!(t.multiplicity(4), 1);
        assert_eq!(t.multiplicity(5), 1);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_parse_line_negative_items() {
        let t = Transaction::parse_line("-5 -3 -1 -5 -1 -2");
        assert_eq!(t.multiplicity(-5), 2);
        assert_eq!(t.multiplicity(-3), 1);
    }

    #[test]
    fn test_from_reader_aggregates() {
        let data = "1 2 -1 -2\n1 -1 -2\n\n2 2 2 -1 7 -1 -2\n";
        let ds = Dataset::from_reader(Cursor::new(data)).unwrap();

        // the blank third line is not a transaction
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.item_frequencies().get(&1), Some(&2));
        assert_eq!(ds.item_frequencies().get(&2), Some(&2));
        assert_eq!(ds.item_frequencies().get(&7), Some(&1));
        assert_eq!(ds.max_length(), 4);
        assert_eq!(ds.item_range(), Some((1, 7)));
        assert_eq!(ds.length_histogram().get(&1), Some(&1));
        assert_eq!(ds.length_histogram().get(&2), Some(&1));
        assert_eq!(ds.length_histogram().get(&4), Some(&1));
    }

    #[test]
    fn test_from_reader_empty_and_sentinel_only() {
        let ds = Dataset::from_reader(Cursor::new("\n-2\n  \n-1 -2\n")).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.item_range(), None);
        assert!(ds.length_profile().is_none());
    }

    #[test]
    fn test_count_at_least() {
        let ds = Dataset::from_reader(Cursor::new("1 -2\n1 2 -2\n1 2 3 -2\n")).unwrap();
        assert_eq!(ds.count_at_least(1), 3);
        assert_eq!(ds.count_at_least(2), 2);
        assert_eq!(ds.count_at_least(3), 1);
        assert_eq!(ds.count_at_least(4), 0);
    }

    #[test]
    fn test_length_profile() {
        let ds = Dataset::from_reader(Cursor::new("1 -2\n1 2 -2\n1 2 3 -2\n")).unwrap();
        let profile = ds.length_profile().unwrap();
        assert!((profile.average - 2.0).abs() < 1e-12);
        assert_eq!(profile.max, 3);
    }

    #[test]
    fn test_read_missing_file() {
        let result = Dataset::read("nonexistent_dataset_file.txt");
        assert!(matches!(result, Err(RadeBoundError::OpenDataset { .. })));
    }
}
