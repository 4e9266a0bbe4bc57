use crate::constants::MAX_ITEM_SLOTS;
use crate::dataset::{Dataset, ItemId};
use crate::error::{RadeBoundError, Result};

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Ordering capability used when sorting the items of a transaction.
///
/// Items that sort last are the most distinguishing ones.
pub trait ItemOrder {
    fn compare(&self, a: ItemId, b: ItemId) -> Ordering;

    /// Dense slot of an item, used to address per-item tables.
    fn slot(&self, item: ItemId) -> Option<usize>;

    /// Number of slots (`max_id - min_id + 1`).
    fn slot_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankEntry {
    pub item: ItemId,
    pub frequency: u64,
}

/// Dense rank table over the item id range.
///
/// Invariant: the entry for item `id` lives at `entries[id + offset]` with
/// `offset = -min_id`, so every slot index is non-negative. Ids inside the range
/// that never occur in the dataset have no entry.
#[derive(Debug, Clone, Default)]
pub struct ItemRanking {
    entries: Vec<Option<RankEntry>>,
    offset: i64,
}

impl ItemRanking {
    pub fn build(dataset: &Dataset) -> Result<Self> {
        match dataset.item_range() {
            Some((min_id, max_id)) => {
                Self::from_frequencies(dataset.item_frequencies(), min_id, max_id)
            }
            None => Ok(Self::default()),
        }
    }

    /// Builds the table for ids in `min_id..=max_id`.
    ///
    /// # Errors
    /// Returns [`RadeBoundError::ItemRangeTooWide`] when the range needs more than
    /// [`MAX_ITEM_SLOTS`] slots. Frequencies outside the range are ignored.
    pub fn from_frequencies(
        frequencies: &BTreeMap<ItemId, u64>,
        min_id: ItemId,
        max_id: ItemId,
    ) -> Result<Self> {
        let too_wide = || RadeBoundError::ItemRangeTooWide {
            min: min_id,
            max: max_id,
            limit: MAX_ITEM_SLOTS,
        };
        let size = max_id
            .checked_sub(min_id)
            .and_then(|span| span.checked_add(1))
            .and_then(|span| usize::try_from(span).ok())
            .filter(|&size| size <= MAX_ITEM_SLOTS)
            .ok_or_else(too_wide)?;
        let offset = min_id.checked_neg().ok_or_else(too_wide)?;

        let mut ranking = Self {
            entries: vec![None; size],
            offset,
        };
        for (&item, &frequency) in frequencies {
            if let Some(index) = ranking.slot(item) {
                ranking.entries[index] = Some(RankEntry { item, frequency });
            }
        }
        Ok(ranking)
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn entry(&self, item: ItemId) -> Option<RankEntry> {
        self.slot(item).and_then(|index| self.entries[index])
    }

    pub fn frequency(&self, item: ItemId) -> u64 {
        self.entry(item).map(|e| e.frequency).unwrap_or(0)
    }
}

impl ItemOrder for ItemRanking {
    /// Ascending frequency, ties broken by ascending id.
    fn compare(&self, a: ItemId, b: ItemId) -> Ordering {
        self.frequency(a)
            .cmp(&self.frequency(b))
            .then_with(|| a.cmp(&b))
    }

    fn slot(&self, item: ItemId) -> Option<usize> {
        let index = item.checked_add(self.offset)?;
        if index < 0 || index as usize >= self.entries.len() {
            return None;
        }
        Some(index as usize)
    }

    fn slot_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ranking_of(data: &str) -> ItemRanking {
        let ds = Dataset::from_reader(Cursor::new(data)).unwrap();
        ItemRanking::build(&ds).unwrap()
    }

    #[test]
    fn test_offset_and_slots_with_negative_ids() {
        let ranking = ranking_of("-3 5 -2\n-3 -2\n");
        assert_eq!(ranking.offset(), 3);
        assert_eq!(ranking.slot_count(), 9);
        assert_eq!(ranking.slot(-3), Some(0));
        assert_eq!(ranking.slot(5), Some(8));
        assert_eq!(ranking.slot(6), None);
        assert_eq!(ranking.slot(-4), None);
        assert_eq!(ranking.frequency(-3), 2);
        assert_eq!(ranking.frequency(5), 1);
        assert_eq!(ranking.entry(0), None);
    }

    #[test]
    fn test_compare_by_frequency() {
        // 1 occurs in 3 transactions, 2 in 2, 3 in 1
        let ranking = ranking_of("1 2 3 -2\n1 2 -2\n1 -2\n");
        assert_eq!(ranking.compare(3, 2), Ordering::Less);
        assert_eq!(ranking.compare(2, 1), Ordering::Less);
        assert_eq!(ranking.compare(1, 3), Ordering::Greater);
        assert_eq!(ranking.compare(2, 2), Ordering::Equal);
    }

    #[test]
    fn test_ties_broken_by_id_regardless_of_input_order() {
        let forward = ranking_of("4 9 -2\n");
        let backward = ranking_of("9 4 -2\n");
        for ranking in [forward, backward] {
            assert_eq!(ranking.compare(4, 9), Ordering::Less);
            assert_eq!(ranking.compare(9, 4), Ordering::Greater);

            let mut items = vec![9, 4];
            items.sort_by(|&a, &b| ranking.compare(a, b));
            assert_eq!(items, vec![4, 9]);
        }
    }

    #[test]
    fn test_item_range_too_wide() {
        // span overflows i64
        let ds = Dataset::from_reader(Cursor::new("-9223372036854775000 9223372036854775000 -2\n"))
            .unwrap();
        assert!(matches!(
            ItemRanking::build(&ds),
            Err(RadeBoundError::ItemRangeTooWide { .. })
        ));

        // fits in i64 but not in memory
        let ds = Dataset::from_reader(Cursor::new("0 100000000000 -2\n")).unwrap();
        assert!(matches!(
            ItemRanking::build(&ds),
            Err(RadeBoundError::ItemRangeTooWide { min: 0, max: 100_000_000_000, .. })
        ));

        let ds = Dataset::from_reader(Cursor::new(format!("{} -2\n", i64::MIN))).unwrap();
        assert!(ItemRanking::build(&ds).is_err());
    }

    #[test]
    fn test_widest_supported_range() {
        let max_id = MAX_ITEM_SLOTS as i64 - 1;
        let ranking = ranking_of(&format!("0 {max_id} -2\n"));
        assert_eq!(ranking.slot_count(), MAX_ITEM_SLOTS);
        assert_eq!(ranking.frequency(max_id), 1);

        let ds = Dataset::from_reader(Cursor::new(format!("0 {} -2\n", max_id + 1))).unwrap();
        assert!(ItemRanking::build(&ds).is_err());
    }

    #[test]
    fn test_empty_dataset_ranking() {
        let ranking = ranking_of("");
        assert_eq!(ranking.slot_count(), 0);
        assert_eq!(ranking.slot(0), None);
    }
}
