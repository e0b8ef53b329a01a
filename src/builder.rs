//! Linear-pass trie construction from sorted keys.
//!
//! Keys are folded in order: each new key shares its longest common prefix
//! with the previous one, so only the divergent tail is appended as fresh
//! nodes under the node at depth `lcp`. The active path is the only state
//! kept between keys, and its length never exceeds the longest key.

use tracing::trace;

use crate::error::{CdatError, Result};
use crate::unit::CodeWidth;

pub(crate) const NIL: u32 = u32::MAX;

/// One node of the intermediate trie.
///
/// Children form a singly linked sibling list in ascending label order.
#[derive(Debug, Clone, Copy)]
pub struct TrieNode {
    pub label: u8,
    pub terminal: bool,
    pub first_child: u32,
    pub next_sibling: u32,
    last_child: u32,
}

impl TrieNode {
    fn new(label: u8) -> Self {
        Self {
            label,
            terminal: false,
            first_child: NIL,
            next_sibling: NIL,
            last_child: NIL,
        }
    }
}

/// Intermediate labeled tree produced by [`TrieBuilder`]. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct Trie {
    nodes: Vec<TrieNode>,
    num_keys: usize,
    max_length: usize,
    width: CodeWidth,
}

impl Trie {
    #[inline]
    pub fn nodes(&self) -> &[TrieNode] {
        &self.nodes
    }

    #[inline]
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    /// Nodes reachable from the root, root included. Zero for an empty set.
    pub fn num_nodes(&self) -> usize {
        if self.num_keys == 0 {
            0
        } else {
            self.nodes.len()
        }
    }

    #[inline]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    #[inline]
    pub fn width(&self) -> CodeWidth {
        self.width
    }

    /// Children of `node` as `(label, node_id)` in ascending label order.
    pub fn children(&self, node: u32) -> Children<'_> {
        Children {
            nodes: &self.nodes,
            next: self.nodes[node as usize].first_child,
        }
    }
}

pub struct Children<'a> {
    nodes: &'a [TrieNode],
    next: u32,
}

impl Iterator for Children<'_> {
    type Item = (u8, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NIL {
            return None;
        }
        let id = self.next;
        let node = &self.nodes[id as usize];
        self.next = node.next_sibling;
        Some((node.label, id))
    }
}

/// Compute the shared prefix length between two byte slices.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Incremental builder; keys must arrive sorted and unique.
#[derive(Debug)]
pub struct TrieBuilder {
    nodes: Vec<TrieNode>,
    /// Node ids along the previous key, `path[d]` at depth `d`.
    path: Vec<u32>,
    prev: Vec<u8>,
    num_keys: usize,
    max_length: usize,
    width: CodeWidth,
}

impl TrieBuilder {
    pub fn new(width: CodeWidth) -> Self {
        Self {
            nodes: vec![TrieNode::new(0)],
            path: vec![0],
            prev: Vec::new(),
            num_keys: 0,
            max_length: 0,
            width,
        }
    }

    /// Builds a trie from an iterator of sorted, duplicate-free keys.
    pub fn build<I, K>(width: CodeWidth, keys: I) -> Result<Trie>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let mut builder = Self::new(width);
        for key in keys {
            builder.push(key.as_ref())?;
        }
        Ok(builder.finish())
    }

    /// Appends the next key. Fails without modifying the trie if the key is
    /// not strictly greater than its predecessor or uses a byte outside the
    /// configured alphabet.
    pub fn push(&mut self, key: &[u8]) -> Result<()> {
        let index = self.num_keys;
        let max_byte = self.width.max_byte();
        if let Some(&byte) = key.iter().find(|&&b| b > max_byte) {
            return Err(CdatError::LabelOutOfRange {
                index,
                byte,
                width: self.width,
            });
        }

        let lcp = if index == 0 {
            0
        } else {
            match self.prev.as_slice().cmp(key) {
                std::cmp::Ordering::Less => common_prefix_len(&self.prev, key),
                std::cmp::Ordering::Equal => return Err(CdatError::Duplicate { index }),
                std::cmp::Ordering::Greater => return Err(CdatError::Unsorted { index }),
            }
        };

        let tail = key.len() - lcp;
        if self.nodes.len() + tail >= NIL as usize {
            return Err(CdatError::CapacityExceeded {
                width: self.width,
                needed: (self.nodes.len() + tail) as u64,
            });
        }

        self.path.truncate(lcp + 1);
        for &label in &key[lcp..] {
            let parent = self.path[self.path.len() - 1] as usize;
            let id = self.nodes.len() as u32;
            self.nodes.push(TrieNode::new(label));

            let last = self.nodes[parent].last_child;
            if last == NIL {
                self.nodes[parent].first_child = id;
            } else {
                self.nodes[last as usize].next_sibling = id;
            }
            self.nodes[parent].last_child = id;
            self.path.push(id);
        }
        let end = self.path[self.path.len() - 1] as usize;
        self.nodes[end].terminal = true;

        self.prev.clear();
        self.prev.extend_from_slice(key);
        self.num_keys += 1;
        self.max_length = self.max_length.max(key.len());
        Ok(())
    }

    pub fn finish(self) -> Trie {
        trace!(
            num_keys = self.num_keys,
            num_nodes = self.nodes.len(),
            max_length = self.max_length,
            "folded key set into trie"
        );
        Trie {
            nodes: self.nodes,
            num_keys: self.num_keys,
            max_length: self.max_length,
            width: self.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_keys(trie: &Trie) -> Vec<Vec<u8>> {
        fn walk(trie: &Trie, node: u32, buf: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
            if trie.nodes()[node as usize].terminal {
                out.push(buf.clone());
            }
            for (label, child) in trie.children(node) {
                buf.push(label);
                walk(trie, child, buf, out);
                buf.pop();
            }
        }
        let mut out = Vec::new();
        walk(trie, 0, &mut Vec::new(), &mut out);
        out
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        let keys = ["Mac", "MacBook", "MacBook_Air", "Mac_Pro"];
        let trie = TrieBuilder::build(CodeWidth::W8, keys).unwrap();
        // root + "Mac" (3) + "Book" (4) + "_Air" (4) + "_Pro" (4)
        assert_eq!(trie.num_nodes(), 16);
        assert_eq!(trie.num_keys(), 4);
        assert_eq!(trie.max_length(), 11);
        let expected: Vec<Vec<u8>> = keys.iter().map(|k| k.as_bytes().to_vec()).collect();
        assert_eq!(collect_keys(&trie), expected);
    }

    #[test]
    fn test_children_are_label_ordered() {
        let trie = TrieBuilder::build(CodeWidth::W8, ["a", "b", "c", "ca", "cb"]).unwrap();
        let labels: Vec<u8> = trie.children(0).map(|(l, _)| l).collect();
        assert_eq!(labels, b"abc");
    }

    #[test]
    fn test_empty_key_marks_root_terminal() {
        let trie = TrieBuilder::build(CodeWidth::W8, [""]).unwrap();
        assert!(trie.nodes()[0].terminal);
        assert_eq!(trie.num_nodes(), 1);
        assert_eq!(trie.num_keys(), 1);

        let trie = TrieBuilder::build(CodeWidth::W8, ["", "a"]).unwrap();
        assert_eq!(collect_keys(&trie), vec![b"".to_vec(), b"a".to_vec()]);
    }

    #[test]
    fn test_empty_set() {
        let trie = TrieBuilder::build(CodeWidth::W8, Vec::<&[u8]>::new()).unwrap();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.num_nodes(), 0);
    }

    #[test]
    fn test_rejects_unsorted() {
        let err = TrieBuilder::build(CodeWidth::W8, ["b", "a"]).unwrap_err();
        assert!(matches!(err, CdatError::Unsorted { index: 1 }));

        // A key that is a prefix of its predecessor is out of order too.
        let err = TrieBuilder::build(CodeWidth::W8, ["ab", "a"]).unwrap_err();
        assert!(matches!(err, CdatError::Unsorted { index: 1 }));
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = TrieBuilder::build(CodeWidth::W8, ["a", "b", "b"]).unwrap_err();
        assert!(matches!(err, CdatError::Duplicate { index: 2 }));
    }

    #[test]
    fn test_seven_bit_alphabet() {
        let keys: [&[u8]; 2] = [b"abc", b"ab\xC3"];
        let err = TrieBuilder::build(CodeWidth::W7, keys).unwrap_err();
        assert!(matches!(
            err,
            CdatError::LabelOutOfRange { index: 1, byte: 0xC3, width: CodeWidth::W7 }
        ));
        assert!(TrieBuilder::build(CodeWidth::W8, [b"ab\xC3".as_slice()]).is_ok());
    }

    #[test]
    fn test_failed_push_leaves_builder_usable() {
        let mut b = TrieBuilder::new(CodeWidth::W8);
        b.push(b"m").unwrap();
        assert!(b.push(b"a").is_err());
        b.push(b"z").unwrap();
        let trie = b.finish();
        assert_eq!(collect_keys(&trie), vec![b"m".to_vec(), b"z".to_vec()]);
    }

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len(b"hello", b"help"), 3);
        assert_eq!(common_prefix_len(b"hello", b"world"), 0);
        assert_eq!(common_prefix_len(b"hello", b"hello"), 5);
        assert_eq!(common_prefix_len(b"", b"hello"), 0);
    }
}
