//! Producers turn in-memory collections into Streams.
//!
//! Each producer spawns one thread that writes every element and then closes the
//! Stream. An empty (or absent) collection yields a Stream that closes without
//! emitting anything.

use crate::{entry::Entry, options::StreamOptions, stream::Stream, stream::spawn_stage};

/// Emits `items` in iteration order.
pub fn from_sequence<T, I>(items: I) -> Stream<T>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
{
    from_sequence_with(&StreamOptions::default(), items)
}

pub fn from_sequence_with<T, I>(options: &StreamOptions, items: I) -> Stream<T>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
{
    let (writer, stream) = Stream::channel_with_capacity(options.get_capacity());
    let items = items.into_iter();
    spawn_stage(options, "source", move || {
        let id = writer.id();
        let mut written = 0usize;
        for item in items {
            if writer.send(item).is_err() {
                log::debug!("{id}: reader hung up after {written} elements");
                return;
            }
            written += 1;
        }
        log::debug!("{id}: source closed after {written} elements");
    });
    stream
}

/// Emits `items` in order; `None` is treated as an empty sequence.
pub fn from_optional_sequence<T>(items: Option<Vec<T>>) -> Stream<T>
where
    T: Send + 'static,
{
    from_sequence(items.unwrap_or_default())
}

/// Emits every key/value pair of `collection` as an [`Entry`], in the collection's own
/// iteration order (unspecified for hash maps).
pub fn from_keyed_collection<K, V, M>(collection: M) -> Stream<Entry<K, V>>
where
    M: IntoIterator<Item = (K, V)>,
    M::IntoIter: Send + 'static,
    K: Send + 'static,
    V: Send + 'static,
{
    from_keyed_collection_with(&StreamOptions::default(), collection)
}

pub fn from_keyed_collection_with<K, V, M>(
    options: &StreamOptions,
    collection: M,
) -> Stream<Entry<K, V>>
where
    M: IntoIterator<Item = (K, V)>,
    M::IntoIter: Send + 'static,
    K: Send + 'static,
    V: Send + 'static,
{
    from_sequence_with(options, collection.into_iter().map(Entry::from))
}
