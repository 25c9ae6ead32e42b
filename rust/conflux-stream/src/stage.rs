//! Stage operators.
//!
//! Every operator consumes one Stream and returns a new one, running its loop on a
//! dedicated thread: read one element, process it, write the result, repeat until the
//! input is closed and drained, then close the output. Because each stage is a single
//! sequential loop, [`transform`] and [`filter`] preserve input order and [`reduce`]
//! folds in delivery order.
//!
//! The operators perform no synchronization on behalf of the supplied closures.
//!
//! If the reader of a stage's output goes away, the stage stops reading and drops its
//! input, which propagates the hang-up to the stages upstream of it.

use crate::{
    options::StreamOptions,
    stream::{Stream, StreamWriter, spawn_stage},
};

/// Applies `f` to every element.
pub fn transform<I, O, F>(input: Stream<I>, f: F) -> Stream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> O + Send + 'static,
{
    transform_with(&StreamOptions::default(), input, f)
}

pub fn transform_with<I, O, F>(options: &StreamOptions, input: Stream<I>, mut f: F) -> Stream<O>
where
    I: Send + 'static,
    O: Send + 'static,
    F: FnMut(I) -> O + Send + 'static,
{
    let (writer, output) = Stream::channel_with_capacity(options.get_capacity());
    spawn_stage(options, "transform", move || {
        let stats = run_stage("transform", input, &writer, |item, writer| {
            writer.send(f(item)).is_ok()
        });
        stats.log("transform", &writer);
    });
    output
}

/// Applies a fallible `f` to every element, routing successes to the first returned
/// Stream and failures to the second.
///
/// Both output Streams are unbounded, so the stage never waits on either reader: the
/// two Streams can be drained in any order, on one thread or on two, and either one
/// can be ignored. Elements are never dropped while their Stream has a reader. The
/// input is consumed at the stage's own pace, without backpressure from the outputs.
pub fn try_transform<I, O, E, F>(input: Stream<I>, f: F) -> (Stream<O>, Stream<E>)
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
    F: FnMut(I) -> Result<O, E> + Send + 'static,
{
    try_transform_with(&StreamOptions::default(), input, f)
}

/// Only the thread name of `options` applies; both outputs are unbounded.
pub fn try_transform_with<I, O, E, F>(
    options: &StreamOptions,
    input: Stream<I>,
    mut f: F,
) -> (Stream<O>, Stream<E>)
where
    I: Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
    F: FnMut(I) -> Result<O, E> + Send + 'static,
{
    let (ok_writer, ok_output) = Stream::unbounded();
    let (err_writer, err_output) = Stream::unbounded();
    spawn_stage(options, "try-transform", move || {
        let mut ok_open = true;
        let mut err_open = true;
        let mut failed = 0usize;
        let stats = run_stage("try-transform", input, &ok_writer, |item, ok_writer| {
            match f(item) {
                Ok(value) if ok_open => ok_open = ok_writer.send(value).is_ok(),
                Ok(_) => {}
                Err(error) => {
                    failed += 1;
                    if err_open {
                        err_open = err_writer.send(error).is_ok();
                    }
                }
            }
            ok_open || err_open
        });
        stats.log("try-transform", &ok_writer);
        if failed != 0 {
            log::debug!("{}: {failed} elements failed", err_writer.id());
        }
    });
    (ok_output, err_output)
}

/// Forwards the elements for which `predicate` returns `true`.
pub fn filter<T, P>(input: Stream<T>, predicate: P) -> Stream<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    filter_with(&StreamOptions::default(), input, predicate)
}

pub fn filter_with<T, P>(options: &StreamOptions, input: Stream<T>, mut predicate: P) -> Stream<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
{
    let (writer, output) = Stream::channel_with_capacity(options.get_capacity());
    spawn_stage(options, "filter", move || {
        let stats = run_stage("filter", input, &writer, |item, writer| {
            !predicate(&item) || writer.send(item).is_ok()
        });
        stats.log("filter", &writer);
    });
    output
}

/// Folds every element into an accumulator starting at `O::default()` and emits the
/// final accumulator as the single element of the output Stream.
///
/// An empty input emits exactly `O::default()`.
pub fn reduce<I, O, F>(input: Stream<I>, f: F) -> Stream<O>
where
    I: Send + 'static,
    O: Default + Send + 'static,
    F: FnMut(O, I) -> O + Send + 'static,
{
    reduce_with(&StreamOptions::default(), input, f)
}

pub fn reduce_with<I, O, F>(options: &StreamOptions, input: Stream<I>, f: F) -> Stream<O>
where
    I: Send + 'static,
    O: Default + Send + 'static,
    F: FnMut(O, I) -> O + Send + 'static,
{
    let (writer, output) = Stream::channel_with_capacity(options.get_capacity());
    spawn_stage(options, "reduce", move || {
        let id = writer.id();
        let result = input.fold(O::default(), f);
        if writer.send(result).is_err() {
            log::debug!("{id}: reader hung up before the reduction result was taken");
        } else {
            log::debug!("{id}: reduce finished");
        }
    });
    output
}

/// Element counts of a finished stage loop.
struct StageStats {
    read: usize,
    hung_up: bool,
}

impl StageStats {
    fn log<T>(&self, stage: &str, writer: &StreamWriter<T>) {
        if self.hung_up {
            log::debug!(
                "{}: {stage} stopped after {} elements, reader hung up",
                writer.id(),
                self.read
            );
        } else {
            log::debug!("{}: {stage} finished after {} elements", writer.id(), self.read);
        }
    }
}

/// Drives the read-process-write loop. `step` returns `false` once the stage has no
/// reader left to write to.
fn run_stage<I, W>(
    stage: &str,
    input: Stream<I>,
    writer: &StreamWriter<W>,
    mut step: impl FnMut(I, &StreamWriter<W>) -> bool,
) -> StageStats {
    log::trace!("{}: {stage} reading {}", writer.id(), input.id());
    let mut read = 0usize;
    for item in input {
        read += 1;
        if !step(item, writer) {
            return StageStats {
                read,
                hung_up: true,
            };
        }
    }
    StageStats {
        read,
        hung_up: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::from_sequence;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_transform_preserves_order() {
        let out = transform(from_sequence(1..=5), |x: i32| x * 10);
        assert_eq!(out.collect::<Vec<_>>(), vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_transform_changes_type() {
        let out = transform(from_sequence(vec!["a", "bb", "ccc"]), str::len);
        assert_eq!(out.collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_filter() {
        let words = vec!["hello", "everyone", "world", "goodness", "gracious"];
        let out = filter(from_sequence(words.clone()), |s: &&str| s.len() > 5);
        assert_eq!(
            out.collect::<Vec<_>>(),
            vec!["everyone", "goodness", "gracious"]
        );

        let none = filter(from_sequence(words.clone()), |_: &&str| false);
        assert_eq!(none.count(), 0);

        let all = filter(from_sequence(words.clone()), |_: &&str| true);
        assert_eq!(all.collect::<Vec<_>>(), words);
    }

    #[test]
    fn test_reduce() {
        let sum = reduce(from_sequence(1..=10), |acc: i64, x: i64| acc + x);
        assert_eq!(sum.collect::<Vec<_>>(), vec![55]);

        let empty = reduce(from_sequence(Vec::<i64>::new()), |acc: i64, x| acc + x);
        assert_eq!(empty.collect::<Vec<_>>(), vec![0]);

        let joined = reduce(from_sequence(vec!["a", "b", "c"]), |mut acc: String, s| {
            acc.push_str(s);
            acc
        });
        assert_eq!(joined.collect::<Vec<_>>(), vec!["abc".to_string()]);
    }

    #[test]
    fn test_try_transform_routes_failures() {
        let (ok, failed) = try_transform(from_sequence(vec!["1", "x", "3", "y"]), |s: &str| {
            s.parse::<u32>().map_err(|_| s.to_string())
        });
        assert_eq!(ok.collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(failed.collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_try_transform_failures_drained_first() {
        let (ok, failed) = try_transform(from_sequence(vec!["1", "x", "3", "y"]), |s: &str| {
            s.parse::<u32>().map_err(|_| s.to_string())
        });
        let mut failures = Vec::new();
        while let Ok(Some(failure)) = failed.recv_timeout(Duration::from_secs(5)) {
            failures.push(failure);
        }
        assert_eq!(failures, vec!["x", "y"]);
        assert_eq!(ok.collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_try_transform_successes_ignored() {
        let (ok, failed) = try_transform(from_sequence(0..100), |x: i32| {
            if x % 10 == 0 { Err(x) } else { Ok(x) }
        });
        assert_eq!(failed.collect::<Vec<_>>(), (0..100).step_by(10).collect::<Vec<_>>());
        assert_eq!(ok.count(), 90);
    }

    #[test]
    fn test_try_transform_failures_only() {
        let (ok, failed) =
            try_transform(from_sequence(0..4), |x: i32| Err::<i32, _>(format!("bad {x}")));
        drop(ok);
        assert_eq!(failed.count(), 4);
    }

    #[test]
    fn test_chained_stages() {
        let evens = filter(from_sequence(0..20), |x: &i32| x % 2 == 0);
        let squares = transform(evens, |x| x * x);
        let total = reduce(squares, |acc: i32, x| acc + x);
        assert_eq!(total.collect::<Vec<_>>(), vec![1140]);
    }

    #[test]
    fn test_backpressure_stalls_upstream() {
        let (writer, input) = Stream::channel();
        let out = transform(input, |x: u32| x + 1);
        let producer = thread::spawn(move || {
            for i in 0..3 {
                writer.send(i).unwrap();
            }
        });
        thread::sleep(Duration::from_millis(50));
        // Nothing has been read downstream, so the producer cannot have finished.
        assert!(!producer.is_finished());
        assert_eq!(out.collect::<Vec<_>>(), vec![1, 2, 3]);
        producer.join().unwrap();
    }

    #[test]
    fn test_downstream_hang_up_stops_stage() {
        let (writer, input) = Stream::channel();
        let out = transform(input, |x: u32| x);
        drop(out);
        let producer = thread::spawn(move || (0..).take_while(|&i| writer.send(i).is_ok()).count());
        let sent = producer.join().unwrap();
        assert!(sent <= 2);
    }

    #[test]
    fn test_named_stage_threads() {
        let options = StreamOptions::new().thread_name("test-pipe");
        let out = transform_with(&options, from_sequence(0..1), |_: i32| {
            thread::current().name().map(str::to_owned)
        });
        assert_eq!(
            out.collect::<Vec<_>>(),
            vec![Some("test-pipe-transform".to_string())]
        );
    }
}
