//! Single-value channel used to hand a task result back to whoever joins it.
//!
//! The channel moves through three states: `Pending` until the sender either delivers a
//! value (`Ready`) or is dropped without one (`Closed`); taking a `Ready` value moves it
//! to `Closed` as well.

use std::sync::{Arc, Condvar, Mutex};

/// Creates a new oneshot channel.
pub fn channel<T>() -> (OneshotSender<T>, OneshotReceiver<T>) {
    let cell = Arc::new(OneshotCell {
        slot: Mutex::new(Slot::Pending),
        condvar: Condvar::new(),
    });
    (OneshotSender(cell.clone()), OneshotReceiver(cell))
}

/// The sending half of a oneshot channel. Dropping it without sending closes the
/// channel.
pub struct OneshotSender<T>(Arc<OneshotCell<T>>);

impl<T> OneshotSender<T> {
    /// Delivers the value, or hands it back if the channel is no longer pending.
    pub fn send(self, value: T) -> Result<(), T> {
        self.0.set(value)
    }
}

impl<T> Drop for OneshotSender<T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// The receiving half of a oneshot channel.
pub struct OneshotReceiver<T>(Arc<OneshotCell<T>>);

impl<T> OneshotReceiver<T> {
    /// Blocks until the value arrives. Returns `None` if the sender went away without
    /// sending or the value was already taken.
    pub fn recv(&self) -> Option<T> {
        let guard = self.0.slot.lock().unwrap();
        let mut guard = self
            .0
            .condvar
            .wait_while(guard, |slot| slot.is_pending())
            .unwrap();
        guard.take()
    }

    pub fn is_pending(&self) -> bool {
        self.0.slot.lock().unwrap().is_pending()
    }
}

struct OneshotCell<T> {
    slot: Mutex<Slot<T>>,
    condvar: Condvar,
}

impl<T> OneshotCell<T> {
    fn set(&self, value: T) -> Result<(), T> {
        let mut slot = self.slot.lock().unwrap();
        if !slot.is_pending() {
            return Err(value);
        }
        *slot = Slot::Ready(value);
        drop(slot);
        self.condvar.notify_all();
        Ok(())
    }

    fn close(&self) {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_pending() {
            *slot = Slot::Closed;
            drop(slot);
            self.condvar.notify_all();
        }
    }
}

enum Slot<T> {
    Pending,
    Ready(T),
    Closed,
}

impl<T> Slot<T> {
    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Closed) {
            Slot::Ready(value) => Some(value),
            Slot::Pending | Slot::Closed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::channel;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_value_taken_once() {
        let (tx, rx) = channel::<&str>();
        assert!(rx.is_pending());
        tx.send("result").unwrap();
        assert!(!rx.is_pending());
        assert_eq!(rx.recv(), Some("result"));
        assert_eq!(rx.recv(), None);
    }


    #[test]
    fn test_result_from_worker_thread() {
        let (tx, rx) = channel::<Vec<u32>>();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            tx.send(vec![1, 2, 3]).unwrap();
        });
        assert!(rx.is_pending());
        assert_eq!(rx.recv(), Some(vec![1, 2, 3]));
        worker.join().unwrap();
    }

    #[test]
    fn test_sender_dropped_without_value() {
        let (tx, rx) = channel::<u64>();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            drop(tx);
        });
        assert_eq!(rx.recv(), None);
        assert!(!rx.is_pending());
        worker.join().unwrap();
    }
}
