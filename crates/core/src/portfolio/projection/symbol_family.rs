//! Symbols whose replays depend on each other.
//!
//! MERGER, SPINOFF and TICKER_CHANGE entries move lots between two symbols, so
//! re-projecting one symbol means re-projecting every symbol linked to it.

use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::transactions::Transaction;

/// Transitive closure over symbol links, seeded with `seeds`.
pub fn symbol_family<'a, I>(transactions: &[Transaction], seeds: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut links: HashMap<&str, Vec<&str>> = HashMap::new();
    for tx in transactions {
        if !tx.transaction_type.links_symbols() {
            continue;
        }
        if let Some(related) = tx.related_symbol.as_deref() {
            links.entry(tx.symbol.as_str()).or_default().push(related);
            links.entry(related).or_default().push(tx.symbol.as_str());
        }
    }

    let mut family = BTreeSet::new();
    let mut queue: VecDeque<&str> = seeds.into_iter().collect();
    while let Some(symbol) = queue.pop_front() {
        if !family.insert(symbol.to_string()) {
            continue;
        }
        if let Some(neighbours) = links.get(symbol) {
            queue.extend(neighbours.iter().copied());
        }
    }
    family
}

/// Entries of `transactions` that belong to `family`.
pub fn family_transactions(
    transactions: &[Transaction],
    family: &BTreeSet<String>,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| family.contains(&tx.symbol))
        .cloned()
        .collect()
}
