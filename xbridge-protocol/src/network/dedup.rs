use crate::data_structures::MessageDigest;
use log::trace;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// How a message reached this node; each class has its own bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageClass {
    Broadcast,
    Directed,
}

// Insertion-ordered bounded set
#[derive(Debug)]
struct SeenSet {
    capacity: usize,
    members: HashSet<MessageDigest>,
    order: VecDeque<MessageDigest>,
}

impl SeenSet {
    fn new(capacity: usize) -> Self {
        SeenSet { capacity, members: HashSet::new(), order: VecDeque::new() }
    }

    fn insert(&mut self, digest: MessageDigest) -> bool {
        if !self.members.insert(digest) {
            return false;
        }
        self.order.push_back(digest);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
                trace!("[Dedup] Evicted digest {}", evicted);
            }
        }
        true
    }
}

#[derive(Debug)]
struct Inner {
    broadcast: SeenSet,
    directed: SeenSet,
}

impl Inner {
    fn contains(&self, digest: &MessageDigest) -> bool {
        self.broadcast.members.contains(digest) || self.directed.members.contains(digest)
    }

    fn set_for(&mut self, class: MessageClass) -> &mut SeenSet {
        match class {
            MessageClass::Broadcast => &mut self.broadcast,
            MessageClass::Directed => &mut self.directed,
        }
    }
}

/// Records digests of processed network messages.
#[derive(Debug)]
pub struct MessageDeduplicator {
    inner: Mutex<Inner>,
}

impl MessageDeduplicator {
    pub fn new(broadcast_capacity: usize, directed_capacity: usize) -> Self {
        MessageDeduplicator {
            inner: Mutex::new(Inner {
                broadcast: SeenSet::new(broadcast_capacity.max(1)),
                directed: SeenSet::new(directed_capacity.max(1)),
            }),
        }
    }

    pub fn is_known(&self, digest: &MessageDigest) -> bool {
        self.inner.lock().contains(digest)
    }

    pub fn mark_known(&self, digest: MessageDigest, class: MessageClass) {
        self.check_and_mark(digest, class);
    }

    /// Returns true if the digest was unseen and is now recorded. The check and
    /// the insert happen under one lock acquisition.
    pub fn check_and_mark(&self, digest: MessageDigest, class: MessageClass) -> bool {
        let mut inner = self.inner.lock();
        if inner.contains(&digest) {
            return false;
        }
        inner.set_for(class).insert(digest)
    }

    pub fn len(&self, class: MessageClass) -> usize {
        let inner = self.inner.lock();
        match class {
            MessageClass::Broadcast => inner.broadcast.members.len(),
            MessageClass::Directed => inner.directed.members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.broadcast.members.is_empty() && inner.directed.members.is_empty()
    }
}
