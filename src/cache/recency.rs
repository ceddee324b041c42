//! Recency List Module
//!
//! Doubly-linked recency ordering backed by a slot arena.
//!
//! - Front = most recently used
//! - Back = least recently used
//!
//! Links are slot indices instead of pointers, so every operation is O(1)
//! without `unsafe`. Vacated slots go on a free list and are reused.

/// Null link.
const NIL: usize = usize::MAX;

// == Node Handle ==
/// Stable reference to a node for as long as it stays in the list.
///
/// A handle outlives its node: once the node is removed the slot may be
/// reused, so callers that keep handles around must check what they point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub(crate) usize);

#[derive(Debug)]
struct Node<T> {
    value: Option<T>,
    prev: usize,
    next: usize,
}

// == Recency List ==
#[derive(Debug)]
pub struct RecencyList<T> {
    nodes: Vec<Node<T>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecencyList<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts `value` as the most recently used node.
    pub fn push_front(&mut self, value: T) -> NodeHandle {
        let node = Node {
            value: Some(value),
            prev: NIL,
            next: NIL,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        NodeHandle(idx)
    }

    // == Move To Front ==
    /// Marks the node as most recently used.
    ///
    /// Returns false if the handle does not point at a live node.
    pub fn move_to_front(&mut self, handle: NodeHandle) -> bool {
        if self.get(handle).is_none() {
            return false;
        }
        if self.head != handle.0 {
            self.unlink(handle.0);
            self.link_front(handle.0);
        }
        true
    }

    // == Remove ==
    /// Removes the node and returns its value.
    ///
    /// Removing a vacant slot is a no-op returning None.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<T> {
        let value = self.nodes.get_mut(handle.0)?.value.take()?;
        self.unlink(handle.0);
        self.free.push(handle.0);
        self.len -= 1;
        Some(value)
    }

    // == Back ==
    /// Returns the least recently used node without removing it.
    pub fn back(&self) -> Option<(NodeHandle, &T)> {
        if self.tail == NIL {
            return None;
        }
        let value = self.nodes[self.tail].value.as_ref()?;
        Some((NodeHandle(self.tail), value))
    }

    // == Pop Back ==
    /// Removes and returns the least recently used value.
    pub fn pop_back(&mut self) -> Option<T> {
        let (handle, _) = self.back()?;
        self.remove(handle)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        self.nodes.get(handle.0)?.value.as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // == Iteration ==
    /// Walks the list from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

// == Iterator ==
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = &self.list.nodes[self.cursor];
        self.cursor = node.next;
        node.value.as_ref()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn order(list: &RecencyList<&'static str>) -> Vec<&'static str> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_list_new() {
        let list: RecencyList<&str> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.back().is_none());
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.len(), 3);
        assert_eq!(order(&list), vec!["key3", "key2", "key1"]);
        assert_eq!(list.back().map(|(_, v)| *v), Some("key1"));
    }

    #[test]
    fn test_move_to_front() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert!(list.move_to_front(a));

        assert_eq!(order(&list), vec!["a", "c", "b"]);
        assert_eq!(list.back().map(|(_, v)| *v), Some("b"));
    }

    #[test]
    fn test_move_head_to_front_is_noop() {
        let mut list = RecencyList::new();

        list.push_front("a");
        let b = list.push_front("b");

        assert!(list.move_to_front(b));
        assert_eq!(order(&list), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_middle() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        let key2 = list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.remove(key2), Some("key2"));
        assert_eq!(list.len(), 2);
        assert_eq!(order(&list), vec!["key3", "key1"]);
    }

    #[test]
    fn test_remove_twice_is_idempotent() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        list.push_front("b");

        assert_eq!(list.remove(a), Some("a"));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.len(), 1);
        assert!(!list.move_to_front(a));
        assert_eq!(order(&list), vec!["b"]);
    }

    #[test]
    fn test_pop_back_in_lru_order() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.pop_back(), Some("key1"));
        assert_eq!(list.pop_back(), Some("key2"));
        assert_eq!(list.pop_back(), Some("key3"));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        list.remove(a);
        let b = list.push_front("b");

        assert_eq!(a, b, "vacated slot should be recycled");
        assert_eq!(list.get(b), Some(&"b"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_order_after_multiple_touches() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        let b = list.push_front("b");
        let c = list.push_front("c");

        list.move_to_front(a);
        list.move_to_front(c);
        list.move_to_front(b);

        assert_eq!(list.pop_back(), Some("a"));
        assert_eq!(list.pop_back(), Some("c"));
        assert_eq!(list.pop_back(), Some("b"));
    }

    #[test]
    fn test_get_out_of_range_handle() {
        let list: RecencyList<&str> = RecencyList::new();
        assert!(list.get(NodeHandle(42)).is_none());
    }
}
