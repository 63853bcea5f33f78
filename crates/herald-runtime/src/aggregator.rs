//! Splits the items of one tick into delivery batches.

use herald_models::Item;

/// Groups `items` into consecutive batches of at most `item_limit` items and
/// at most `byte_limit` encoded bytes.
///
/// Order is preserved and packing is greedy: an item that would push the
/// current batch over either limit starts the next one. An item larger than
/// `byte_limit` on its own still gets a batch to itself; the notifier decides
/// how to shorten it. Limits of zero are treated as one.
pub fn batch(items: Vec<Item>, item_limit: usize, byte_limit: usize) -> Vec<Vec<Item>> {
    let item_limit = item_limit.max(1);
    let byte_limit = byte_limit.max(1);

    let mut batches = Vec::new();
    let mut current: Vec<Item> = Vec::new();
    let mut bytes = 0usize;

    for item in items {
        let size = item.encoded_len();
        if !current.is_empty()
            && (current.len() >= item_limit || bytes.saturating_add(size) > byte_limit)
        {
            batches.push(std::mem::take(&mut current));
            bytes = 0;
        }
        bytes = bytes.saturating_add(size);
        current.push(item);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
