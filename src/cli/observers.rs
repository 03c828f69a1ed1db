/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<A> = Box<dyn Fn(&A) + Send + Sync>;

/// Listeners called in registration order after every mutation.
pub struct Observers<A: ?Sized> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<A>)>,
}

impl<A: ?Sized> Default for Observers<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<A: ?Sized> Observers<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        tracing::debug!("Registered listener {:?}", id);
        id
    }

    /// Returns false when the handle was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn notify(&self, value: &A) {
        for (_, listener) in &self.listeners {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn unsubscribed_listener_stops_hearing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut observers: Observers<[u8]> = Observers::new();

        let counter = hits.clone();
        let id = observers.subscribe(move |bytes: &[u8]| {
            counter.fetch_add(bytes.len(), Ordering::SeqCst);
        });
        observers.notify(&[1, 2, 3][..]);
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&[4][..]);

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(observers.is_empty());
    }
}
