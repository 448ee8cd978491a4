use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use async_channel::{Receiver, Sender};

/// Single-fire completion signal for a single-threaded event loop.
///
/// The first [`Latch::fire`] stores the value and closes the underlying
/// channel, which wakes every waiter; later fires are ignored. Awaiting a
/// latch that has already fired resolves on the first poll. Clones share the
/// same signal.
pub struct Latch<T> {
    value: Rc<RefCell<Option<T>>>,
    closer: Sender<()>,
    closed: Receiver<()>,
}

impl<T> Clone for Latch<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            closer: self.closer.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<T> Default for Latch<T> {
    fn default() -> Self {
        let (closer, closed) = async_channel::bounded(1);
        Self {
            value: Rc::new(RefCell::new(None)),
            closer,
            closed,
        }
    }
}

impl<T> std::fmt::Debug for Latch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl<T> Latch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fired(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// Fires the latch.
    ///
    /// Returns `false` (and drops `value`) if it had already fired.
    pub fn fire(&self, value: T) -> bool {
        {
            let mut slot = self.value.borrow_mut();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.closer.close();
        true
    }
}

impl<T: Clone + 'static> Latch<T> {
    pub fn get(&self) -> Option<T> {
        self.value.borrow().clone()
    }

    /// Resolves with the fired value.
    pub fn wait(&self) -> impl Future<Output = T> + use<T> {
        let value = Rc::clone(&self.value);
        let closed = self.closed.clone();
        async move {
            loop {
                if let Some(v) = value.borrow().clone() {
                    return v;
                }
                // Nothing is ever sent: `recv` returns once `fire` closes the channel.
                let _ = closed.recv().await;
            }
        }
    }
}
