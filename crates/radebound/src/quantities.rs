use crate::dataset::{Dataset, ItemId, Transaction};
use crate::ranking::ItemOrder;

use log::debug;
use std::collections::BTreeMap;

/// (cumulative count k, own multiplicity m)
pub type CountPair = (usize, usize);

/// Per-item distribution of (k, m) pairs: pair -> number of transactions.
pub type ItemQuantities = BTreeMap<CountPair, u64>;

/// Quantity records for every item slot of a ranking.
#[derive(Debug, Clone, Default)]
pub struct QuantityTable {
    per_slot: Vec<ItemQuantities>,
}

impl QuantityTable {
    pub fn with_slots(slot_count: usize) -> Self {
        Self {
            per_slot: vec![ItemQuantities::new(); slot_count],
        }
    }

    /// Walks every transaction of `dataset` in rank order.
    pub fn aggregate<O: ItemOrder>(dataset: &Dataset, order: &O) -> Self {
        let mut table = Self::with_slots(order.slot_count());
        for transaction in dataset.transactions() {
            table.record(transaction, order);
        }
        debug!(
            "Aggregated quantities: {} slots, {} distinct (k, m) records",
            table.per_slot.len(),
            table.per_slot.iter().map(BTreeMap::len).sum::<usize>()
        );
        table
    }

    /// Sorts the transaction's items ascending by `order` and walks them from the
    /// back, accumulating multiplicities into k. The first item visited records its
    /// own multiplicity; the last one records the whole transaction length.
    pub fn record<O: ItemOrder>(&mut self, transaction: &Transaction, order: &O) {
        let mut items: Vec<(ItemId, usize)> = transaction
            .items()
            .iter()
            .map(|(&item, &multiplicity)| (item, multiplicity))
            .collect();
        items.sort_by(|a, b| order.compare(a.0, b.0));

        let mut k = 0usize;
        for &(item, multiplicity) in items.iter().rev() {
            k += multiplicity;
            let Some(slot) = order.slot(item) else {
                continue;
            };
            if slot >= self.per_slot.len() {
                self.per_slot.resize_with(slot + 1, ItemQuantities::new);
            }
            *self.per_slot[slot].entry((k, multiplicity)).or_insert(0) += 1;
        }
    }

    pub fn for_item<O: ItemOrder>(&self, item: ItemId, order: &O) -> Option<&ItemQuantities> {
        order.slot(item).and_then(|slot| self.per_slot.get(slot))
    }

    pub fn slot(&self, slot: usize) -> Option<&ItemQuantities> {
        self.per_slot.get(slot)
    }
}
