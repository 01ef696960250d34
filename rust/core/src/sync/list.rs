use std::sync::atomic::{AtomicBool, Ordering};

use crate::prelude::*;

/// A pure list update: takes the previous list, returns the next one.
pub type ListUpdate<'a, R> = Box<dyn FnOnce(Vec<R>) -> Vec<R> + Send + 'a>;

/// Receiver of list updates. Implementations apply each update atomically
/// with respect to readers.
pub trait ListSetter<R>: Send + Sync {
    fn apply(&self, update: ListUpdate<'_, R>);
}

/// Thread-safe list owned by a table handle.
///
/// Once [`SharedList::detach`] is called, updates are dropped silently. This
/// covers operations still in flight when their owner goes away.
pub struct SharedList<R> {
    items: RwLock<Vec<R>>,
    detached: AtomicBool,
}

impl<R> Default for SharedList<R> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            detached: AtomicBool::new(false),
        }
    }
}

impl<R: Clone + Send + Sync> SharedList<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            items: RwLock::new(items),
            detached: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn replace(&self, items: Vec<R>) {
        self.apply(Box::new(move |_| items));
    }

    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<R>> {
        self.items
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<R: Clone + Send + Sync> ListSetter<R> for SharedList<R> {
    fn apply(&self, update: ListUpdate<'_, R>) {
        if self.is_detached() {
            trace!("list detached, update ignored");
            return;
        }
        let mut items = self
            .items
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = std::mem::take(&mut *items);
        *items = update(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_see_previous_list() {
        let list = SharedList::new(vec![1, 2]);
        list.apply(Box::new(|mut v| {
            v.push(3);
            v
        }));
        assert_eq!(list.snapshot(), vec![1, 2, 3]);
        list.replace(vec![9]);
        assert_eq!(list.snapshot(), vec![9]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn detached_list_ignores_updates() {
        let list = SharedList::new(vec!["a"]);
        list.detach();
        list.apply(Box::new(|_| vec![]));
        list.replace(vec!["b", "c"]);
        assert!(list.is_detached());
        assert_eq!(list.snapshot(), vec!["a"]);
    }

    #[test]
    fn replace_from_another_thread() {
        let list = std::sync::Arc::new(SharedList::new(vec![String::from("old")]));
        let writer = list.clone();
        std::thread::spawn(move || writer.replace(vec!["new".into(), "rows".into()]))
            .join()
            .unwrap();
        assert_eq!(list.snapshot(), ["new", "rows"]);
        assert!(!list.is_empty());
    }
}
