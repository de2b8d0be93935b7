//! Subscriber registry shared by the preference and currency stores.
//!
//! Single-threaded by design: callbacks run synchronously on the thread that
//! triggered the change, in registration order. Registry mutations made from
//! inside a callback are safe — removals take effect for the remainder of
//! the current delivery pass, additions only from the next one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by `subscribe`, used to release the subscription.
///
/// Tokens are unique per store for the life of the process; releasing the
/// same token twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

type Callback<E> = Box<dyn FnMut(&E)>;

struct Entry<C, E> {
    token: u64,
    channel: C,
    // Each callback sits behind its own RefCell so the registry is never
    // borrowed while user code runs. A callback may therefore subscribe,
    // unsubscribe, or trigger another notification without tripping a
    // borrow panic.
    callback: Rc<RefCell<Callback<E>>>,
}

pub(crate) struct Dispatcher<C, E> {
    entries: RefCell<Vec<Entry<C, E>>>,
    next_token: Cell<u64>,
}

impl<C: Copy + PartialEq, E> Dispatcher<C, E> {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_token: Cell::new(1),
        }
    }

    pub fn subscribe(&self, channel: C, callback: Callback<E>) -> SubscriptionToken {
        let token = self.next_token.get();
        self.next_token.set(token + 1);
        self.entries.borrow_mut().push(Entry {
            token,
            channel,
            callback: Rc::new(RefCell::new(callback)),
        });
        SubscriptionToken(token)
    }

    /// Returns true if the token was still registered.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.token != token.0);
        entries.len() != before
    }

    pub fn notify(&self, channel: C, event: &E) {
        // Snapshot the matching callbacks up front, then re-check liveness
        // before each call so an unsubscribe earlier in the pass is honored.
        let snapshot: Vec<(u64, Rc<RefCell<Callback<E>>>)> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.channel == channel)
            .map(|e| (e.token, Rc::clone(&e.callback)))
            .collect();

        for (token, callback) in snapshot {
            let live = self.entries.borrow().iter().any(|e| e.token == token);
            if !live {
                continue;
            }
            (callback.borrow_mut())(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq)]
    enum Chan {
        A,
        B,
    }

    #[test]
    fn delivers_only_to_matching_channel() {
        let dispatcher: Dispatcher<Chan, String> = Dispatcher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&seen);
        dispatcher.subscribe(Chan::A, Box::new(move |e: &String| sink.borrow_mut().push(format!("a:{}", e))));
        let sink = Rc::clone(&seen);
        dispatcher.subscribe(Chan::B, Box::new(move |e: &String| sink.borrow_mut().push(format!("b:{}", e))));

        dispatcher.notify(Chan::A, &"x".to_string());
        assert_eq!(*seen.borrow(), vec!["a:x".to_string()]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let dispatcher: Dispatcher<Chan, u32> = Dispatcher::new();
        let count = Rc::new(Cell::new(0));

        let c = Rc::clone(&count);
        let token = dispatcher.subscribe(Chan::A, Box::new(move |_| c.set(c.get() + 1)));

        dispatcher.notify(Chan::A, &1);
        assert!(dispatcher.unsubscribe(token));
        dispatcher.notify(Chan::A, &2);

        assert_eq!(count.get(), 1);
        // Second release is a no-op.
        assert!(!dispatcher.unsubscribe(token));
    }

    #[test]
    fn unsubscribe_during_notify_skips_later_delivery() {
        let dispatcher: Rc<Dispatcher<Chan, u32>> = Rc::new(Dispatcher::new());
        let count = Rc::new(Cell::new(0));

        // First subscriber removes the second one mid-pass.
        let token_cell: Rc<Cell<Option<SubscriptionToken>>> = Rc::new(Cell::new(None));
        let d = Rc::clone(&dispatcher);
        let tc = Rc::clone(&token_cell);
        dispatcher.subscribe(
            Chan::A,
            Box::new(move |_| {
                if let Some(token) = tc.take() {
                    d.unsubscribe(token);
                }
            }),
        );
        let c = Rc::clone(&count);
        let second = dispatcher.subscribe(Chan::A, Box::new(move |_| c.set(c.get() + 1)));
        token_cell.set(Some(second));

        dispatcher.notify(Chan::A, &0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn subscribe_during_notify_takes_effect_next_pass() {
        let dispatcher: Rc<Dispatcher<Chan, u32>> = Rc::new(Dispatcher::new());
        let count = Rc::new(Cell::new(0));

        let d = Rc::clone(&dispatcher);
        let c = Rc::clone(&count);
        let added = Rc::new(Cell::new(false));
        let flag = Rc::clone(&added);
        dispatcher.subscribe(
            Chan::A,
            Box::new(move |_| {
                if !flag.get() {
                    flag.set(true);
                    let c = Rc::clone(&c);
                    d.subscribe(Chan::A, Box::new(move |_| c.set(c.get() + 1)));
                }
            }),
        );

        dispatcher.notify(Chan::A, &0);
        assert_eq!(count.get(), 0, "added mid-pass, must not fire this pass");

        dispatcher.notify(Chan::A, &0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn delivery_order_is_registration_order() {
        let dispatcher: Dispatcher<Chan, u32> = Dispatcher::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            dispatcher.subscribe(Chan::A, Box::new(move |_| sink.borrow_mut().push(label)));
        }

        dispatcher.notify(Chan::A, &0);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }
}
