//! Bounded batch fan-out

use std::collections::BTreeMap;
use std::future::Future;

use futures_util::stream::{FuturesUnordered, StreamExt};

use super::errors::AdapterResult;

/// Run `op` over `items` with at most `max_in_flight` operations pending.
///
/// After the first error no further item is started; operations already in
/// flight run to completion before that error is returned.
pub(crate) async fn fan_out<T, F, Fut>(
    items: Vec<T>,
    max_in_flight: usize,
    mut op: F,
) -> AdapterResult<()>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = AdapterResult<()>>,
{
    let limit = max_in_flight.max(1);
    let mut pending = items.into_iter();
    let mut in_flight = FuturesUnordered::new();
    let mut first_error = None;

    loop {
        while first_error.is_none() && in_flight.len() < limit {
            match pending.next() {
                Some(item) => in_flight.push(op(item)),
                None => break,
            }
        }
        match in_flight.next().await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            None => break,
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Keep only the last item for each key, in the order those items appeared
pub(crate) fn last_per_key<T, K, F>(items: Vec<T>, key: F) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut last = BTreeMap::new();
    for (position, item) in items.iter().enumerate() {
        last.insert(key(item), position);
    }
    items
        .into_iter()
        .enumerate()
        .filter(|(position, item)| last.get(&key(item)) == Some(position))
        .map(|(_, item)| item)
        .collect()
}
