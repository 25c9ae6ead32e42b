use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::{
    entry::Entry,
    stream::{Stream, StreamId},
};

/// A chain of stage operators wired between an input Stream and an output Stream.
///
/// The chain is built once, by the closure handed to [`Pipeline::new`]; every stage it
/// creates starts running immediately on its own thread, but nothing flows until the
/// output is consumed by one of the terminal operations ([`collect`](Self::collect),
/// [`collect_map`](Self::collect_map), [`for_each`](Self::for_each)).
///
/// A pipeline can be drained only once. Terminal operations invoked after the output
/// has been consumed see an already closed Stream and return an empty result.
pub struct Pipeline<I, O> {
    input: StreamId,
    output: Option<Stream<O>>,
    _input: PhantomData<fn(I)>,
}

impl<I, O> Pipeline<I, O> {
    /// Wires the pipeline by calling `build` once with the input Stream.
    ///
    /// `build` composes stage operators and returns the last Stream of the chain; it is
    /// expected to do no I/O of its own.
    pub fn new<B>(input: Stream<I>, build: B) -> Pipeline<I, O>
    where
        B: FnOnce(Stream<I>) -> Stream<O>,
    {
        let input_id = input.id();
        let output = build(input);
        log::debug!("pipeline {input_id} -> {} wired", output.id());
        Pipeline {
            input: input_id,
            output: Some(output),
            _input: PhantomData,
        }
    }

    /// Identity of the Stream the pipeline was built from.
    pub fn input_id(&self) -> StreamId {
        self.input
    }

    /// Identity of the final Stream, or `None` once the pipeline has been drained.
    pub fn output_id(&self) -> Option<StreamId> {
        self.output.as_ref().map(Stream::id)
    }

    /// Returns `true` once a terminal operation has consumed the output.
    pub fn is_drained(&self) -> bool {
        self.output.is_none()
    }

    /// Drains the output into a vector, blocking until the last stage closes it.
    pub fn collect(&mut self) -> Vec<O> {
        self.take_output()
            .map(|output| output.collect())
            .unwrap_or_default()
    }

    /// Feeds every output element to `f`, blocking until the last stage closes the
    /// output. Returns the number of elements seen.
    pub fn for_each<F>(&mut self, mut f: F) -> usize
    where
        F: FnMut(O),
    {
        let Some(output) = self.take_output() else {
            return 0;
        };
        let mut count = 0;
        for item in output {
            f(item);
            count += 1;
        }
        count
    }

    /// Hands the output Stream over to the caller for custom consumption.
    pub fn into_output(mut self) -> Stream<O> {
        self.take_output().unwrap_or_else(Stream::empty)
    }

    fn take_output(&mut self) -> Option<Stream<O>> {
        let output = self.output.take();
        if output.is_none() {
            log::warn!("pipeline {} consumed more than once", self.input);
        }
        output
    }
}

impl<I, K, V> Pipeline<I, Entry<K, V>>
where
    K: Eq + Hash,
{
    /// Drains an output of entries into a map. Later entries win on duplicate keys.
    pub fn collect_map(&mut self) -> HashMap<K, V> {
        self.take_output()
            .map(|output| output.map(Entry::into_parts).collect())
            .unwrap_or_default()
    }
}

impl<I, O> std::fmt::Debug for Pipeline<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("input", &self.input)
            .field("output", &self.output_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::{from_keyed_collection, from_optional_sequence, from_sequence};
    use crate::stage::{filter, reduce, transform};

    #[test]
    fn test_identity_pipeline() {
        let input = from_sequence(vec![3, 1, 2]);
        let input_id = input.id();
        let mut pipeline = Pipeline::new(input, |s| s);
        assert_eq!(pipeline.input_id(), input_id);
        assert_eq!(pipeline.output_id(), Some(input_id));
        assert_eq!(pipeline.collect(), vec![3, 1, 2]);
    }

    #[test]
    fn test_transform_pipeline() {
        let xs: Vec<i32> = (0..50).collect();
        let mut pipeline =
            Pipeline::new(from_sequence(xs.clone()), |s| transform(s, |x| x * 3 - 1));
        assert_eq!(
            pipeline.collect(),
            xs.iter().map(|x| x * 3 - 1).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_empty_pipelines() {
        let mut pipeline = Pipeline::new(from_sequence(Vec::<u8>::new()), |s| transform(s, |x| x));
        assert!(pipeline.collect().is_empty());

        let mut pipeline = Pipeline::new(from_optional_sequence::<u8>(None), |s| s);
        assert!(pipeline.collect().is_empty());
    }

    #[test]
    fn test_second_collect_is_empty() {
        let mut pipeline = Pipeline::new(from_sequence(vec![1, 2, 3]), |s| s);
        assert_eq!(pipeline.collect(), vec![1, 2, 3]);
        assert!(pipeline.is_drained());
        assert!(pipeline.collect().is_empty());
        assert_eq!(pipeline.for_each(|_| {}), 0);
        assert_eq!(pipeline.output_id(), None);
    }

    #[test]
    fn test_reduce_pipeline() {
        let mut pipeline = Pipeline::new(from_sequence(Vec::<u64>::new()), |s| {
            reduce(s, |acc: u64, x| acc + x)
        });
        assert_eq!(pipeline.collect(), vec![0]);
    }

    #[test]
    fn test_collect_map() {
        let source: HashMap<String, u32> = [("a".to_string(), 1), ("bb".to_string(), 2)]
            .into_iter()
            .collect();
        let mut pipeline = Pipeline::new(from_keyed_collection(source), |s| {
            transform(s, |e: Entry<String, u32>| {
                let (k, v) = e.into_parts();
                Entry::new(k.to_uppercase(), v * 100)
            })
        });
        let map = pipeline.collect_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["A"], 100);
        assert_eq!(map["BB"], 200);
        assert!(pipeline.collect_map().is_empty());
    }

    #[test]
    fn test_for_each_and_into_output() {
        let mut seen = Vec::new();
        let mut pipeline = Pipeline::new(from_sequence(0..10), |s| filter(s, |x: &i32| x % 3 == 0));
        assert_eq!(pipeline.for_each(|x| seen.push(x)), 4);
        assert_eq!(seen, vec![0, 3, 6, 9]);

        let pipeline = Pipeline::new(from_sequence(vec!['a', 'b']), |s| s);
        let output = pipeline.into_output();
        assert_eq!(output.collect::<String>(), "ab");
    }
}
