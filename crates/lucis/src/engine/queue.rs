use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, PoisonError},
};

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer multi-consumer FIFO.
///
/// [WorkQueue::pop] blocks until an item is available or the queue is closed
/// and drained.
pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// A closed queue holding `items`
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let queue = Self::new();
        queue.extend(items);
        queue.close();
        queue
    }

    /// Items pushed after [WorkQueue::close] are dropped
    pub fn push(&self, item: T) {
        self.extend(std::iter::once(item));
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            log::warn!("items pushed on a closed work queue are dropped");
            return;
        }
        state.items.extend(items);
        self.available.notify_all();
    }

    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.available.notify_all();
    }

    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::WorkQueue;

    #[test]
    fn pop_waits_for_producers() {
        let queue = Arc::new(WorkQueue::new());
        let consumer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                let mut got = vec![];
                while let Some(item) = queue.pop() {
                    got.push(item);
                }
                got
            })
        };
        for i in 0..100 {
            queue.push(i);
        }
        queue.close();
        assert_eq!(consumer.join().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn closed_queue_drains_then_stops() {
        let queue = WorkQueue::from_items([1, 2]);
        queue.push(3);
        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }
}
