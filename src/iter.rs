//! Lazy search cursors.
//!
//! Each cursor owns its traversal state and a key buffer reused across
//! results. [`advance`](PrefixIter::advance) moves to the next hit and the
//! current key is borrowed from the buffer; the `Iterator` impls copy it out
//! for convenience.

use crate::dictionary::Dictionary;
use crate::unit::CodeUnit;

/// Keys that are prefixes of a query, shortest first.
pub struct PrefixIter<'a, D, U> {
    dict: &'a Dictionary<D, U>,
    query: Vec<u8>,
    /// Bytes of `query` consumed so far; the current key is `query[..pos]`.
    pos: usize,
    slot: usize,
    id: u64,
    started: bool,
    done: bool,
}

impl<'a, D: AsRef<[u8]>, U: CodeUnit> PrefixIter<'a, D, U> {
    pub(crate) fn new(dict: &'a Dictionary<D, U>, query: &[u8]) -> Self {
        Self {
            dict,
            query: query.to_vec(),
            pos: 0,
            slot: 0,
            id: 0,
            started: false,
            done: dict.root().is_none(),
        }
    }

    /// Steps to the next key that is a prefix of the query.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        if !self.started {
            self.started = true;
            if self.dict.is_terminal(self.slot) {
                self.id = self.dict.id_of(self.slot);
                return true;
            }
        }
        // No stored key is longer than max_length; stepping past it only
        // happens on damaged bytes.
        let limit = self.query.len().min(self.dict.max_length());
        while self.pos < limit {
            match self.dict.child(self.slot, self.query[self.pos]) {
                Some(next) => {
                    self.slot = next;
                    self.pos += 1;
                    if self.dict.is_terminal(next) {
                        self.id = self.dict.id_of(next);
                        return true;
                    }
                }
                None => break,
            }
        }
        self.done = true;
        false
    }

    /// Current key. Valid after `advance` returned `true`.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.query[..self.pos]
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<D: AsRef<[u8]>, U: CodeUnit> Iterator for PrefixIter<'_, D, U> {
    type Item = (Vec<u8>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().then(|| (self.key().to_vec(), self.id))
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    slot: usize,
    depth: usize,
    label: u8,
}

/// Keys extending a query, in lexicographic order.
///
/// Depth-first over the subtree below the query's node. Children come from the
/// sibling table in ascending label order and are pushed reversed so the stack
/// pops them ascending.
pub struct PredictiveIter<'a, D, U> {
    dict: &'a Dictionary<D, U>,
    stack: Vec<Frame>,
    key: Vec<u8>,
    query_len: usize,
    id: u64,
}

impl<'a, D: AsRef<[u8]>, U: CodeUnit> PredictiveIter<'a, D, U> {
    pub(crate) fn new(dict: &'a Dictionary<D, U>, query: &[u8]) -> Self {
        let mut stack = Vec::new();
        let mut slot = dict.root();
        for &byte in query {
            slot = slot.and_then(|s| dict.child(s, byte));
        }
        if let Some(slot) = slot {
            stack.push(Frame {
                slot,
                depth: query.len(),
                label: 0,
            });
        }
        let mut key = Vec::with_capacity(dict.max_length().max(query.len()));
        key.extend_from_slice(query);
        Self {
            dict,
            stack,
            key,
            query_len: query.len(),
            id: 0,
        }
    }

    /// Steps to the next key extending the query.
    pub fn advance(&mut self) -> bool {
        while let Some(frame) = self.stack.pop() {
            if frame.depth > self.query_len {
                if frame.depth > self.dict.max_length() {
                    // Deeper than any stored key: the structure is damaged.
                    self.stack.clear();
                    return false;
                }
                self.key.truncate(frame.depth - 1);
                self.key.push(frame.label);
            } else {
                self.key.truncate(frame.depth);
            }

            self.push_children(frame);

            if self.dict.is_terminal(frame.slot) {
                self.id = self.dict.id_of(frame.slot);
                return true;
            }
        }
        false
    }

    fn push_children(&mut self, frame: Frame) {
        let Some(base) = self.dict.base(frame.slot) else {
            return;
        };
        let start = self.stack.len();
        let mut label = self.dict.sibling_entry(frame.slot).0;
        // Labels strictly increase along the chain, so it ends within 256 steps.
        loop {
            let Some(slot) = base.checked_add(usize::from(label)) else {
                break;
            };
            if !self.dict.owns(slot, label) {
                break;
            }
            self.stack.push(Frame {
                slot,
                depth: frame.depth + 1,
                label,
            });
            match self.dict.sibling_entry(slot).1 {
                0 => break,
                gap => match label.checked_add(gap) {
                    Some(next) => label = next,
                    None => break,
                },
            }
        }
        self.stack[start..].reverse();
    }

    /// Current key. Valid after `advance` returned `true`.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<D: AsRef<[u8]>, U: CodeUnit> Iterator for PredictiveIter<'_, D, U> {
    type Item = (Vec<u8>, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().then(|| (self.key.clone(), self.id))
    }
}
