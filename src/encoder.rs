//! Double-array placement of the intermediate trie.
//!
//! Nodes are placed breadth-first. For each node with children the encoder
//! picks the lowest candidate base `b >= 1` such that every slot `b + label` is free and
//! no other node already uses `b`. Unique bases make the stored label a
//! sufficient parent check: a slot `s` reached from `p` with label `c` belongs
//! to `p` iff `label(s) == c`, because `base(parent(s)) == s - label(s)`.
//!
//! Free slots are kept in an ascending doubly linked list, so candidate bases
//! are visited lowest first and output is byte-identical for identical input.
//! A free slot that has been rejected as a first-child position
//! `RETIRE_AFTER` times leaves the list; it stays free and can still receive a
//! non-first child. This bounds the scan when old holes accumulate.

use std::collections::VecDeque;
use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::bit_vector::BitVectorBuilder;
use crate::builder::Trie;
use crate::error::{CdatError, Result};
use crate::format::{write_le, Header, HEADER_SIZE, SIBLING_BYTES, VERSION};
use crate::unit::CodeUnit;

const NIL: usize = usize::MAX;
const RETIRE_AFTER: u8 = 32;

/// Lays a [`Trie`] out as packed code units plus auxiliary bit vectors.
///
/// Bases are chosen lowest first among the slots still on the free list.
/// Slots rejected `RETIRE_AFTER` (32) times as a first-child position drop
/// off that list, so the chosen base is not always the lowest admissible
/// one. Output is still a pure function of the key set and width.
pub struct CompactEncoder<U: CodeUnit> {
    units: Vec<u64>,
    parents: Vec<u64>,
    first_labels: Vec<u8>,
    sibling_gaps: Vec<u8>,
    occupied: Vec<bool>,
    used_bases: Vec<bool>,
    next_free: Vec<usize>,
    prev_free: Vec<usize>,
    linked: Vec<bool>,
    rejections: Vec<u8>,
    free_head: usize,
    free_tail: usize,
    probes: u64,
    _unit: PhantomData<U>,
}

impl<U: CodeUnit> CompactEncoder<U> {
    fn new() -> Self {
        Self {
            units: Vec::new(),
            parents: Vec::new(),
            first_labels: Vec::new(),
            sibling_gaps: Vec::new(),
            occupied: Vec::new(),
            used_bases: Vec::new(),
            next_free: Vec::new(),
            prev_free: Vec::new(),
            linked: Vec::new(),
            rejections: Vec::new(),
            free_head: NIL,
            free_tail: NIL,
            probes: 0,
            _unit: PhantomData,
        }
    }

    /// Encodes `trie` into the serialized dictionary layout.
    pub fn encode(trie: &Trie) -> Result<Vec<u8>> {
        debug_assert_eq!(trie.width(), U::WIDTH);
        let max_length = u32::try_from(trie.max_length()).map_err(|_| CdatError::CapacityExceeded {
            width: U::WIDTH,
            needed: trie.max_length() as u64,
        })?;

        let mut enc = Self::new();
        let mut alphabet = [false; 256];
        if trie.num_keys() > 0 {
            enc.place(trie, &mut alphabet)?;
        }
        let alphabet_size = alphabet.iter().filter(|&&used| used).count() as u32;

        let out = enc.serialize(trie, max_length, alphabet_size);
        debug!(
            width = %U::WIDTH,
            num_keys = trie.num_keys(),
            num_nodes = trie.num_nodes(),
            num_units = enc.units.len(),
            alphabet_size,
            bytes = out.len(),
            "encoded double array"
        );
        Ok(out)
    }

    fn place(&mut self, trie: &Trie, alphabet: &mut [bool; 256]) -> Result<()> {
        let nodes = trie.nodes();
        self.occupy(0);
        self.units[0] = U::pack(0, 0, nodes[0].terminal);
        self.parents[0] = 0;

        let mut queue: VecDeque<(u32, usize)> = VecDeque::new();
        queue.push_back((0, 0));
        let mut children: SmallVec<[(u8, u32); 16]> = SmallVec::new();

        while let Some((node, slot)) = queue.pop_front() {
            children.clear();
            children.extend(trie.children(node));
            if children.is_empty() {
                continue;
            }

            let base = self.find_base(&children)?;
            self.mark_base(base);
            let raw = self.units[slot];
            self.units[slot] = U::pack(base as u64, U::label(raw), U::is_terminal(raw));
            self.first_labels[slot] = children[0].0;

            for (i, &(label, child)) in children.iter().enumerate() {
                let child_slot = base + label as usize;
                self.occupy(child_slot);
                self.units[child_slot] =
                    U::pack(0, u32::from(label), nodes[child as usize].terminal);
                self.parents[child_slot] = slot as u64;
                self.sibling_gaps[child_slot] = children
                    .get(i + 1)
                    .map_or(0, |&(next, _)| next - label);
                alphabet[label as usize] = true;
                queue.push_back((child, child_slot));
            }
        }

        trace!(
            num_units = self.units.len(),
            probes = self.probes,
            "double array placement finished"
        );
        Ok(())
    }

    fn find_base(&mut self, children: &[(u8, u32)]) -> Result<usize> {
        let first = children[0].0 as usize;

        let mut cand = self.free_head;
        while cand != NIL {
            let next = self.next_free[cand];
            if cand > first {
                let base = cand - first;
                self.check_capacity(base)?;
                if self.fits(base, children) {
                    return Ok(base);
                }
            }
            self.reject(cand);
            cand = next;
        }

        // Every slot past the end is free; only the base itself can collide.
        let mut slot = self.units.len().max(first + 1);
        loop {
            let base = slot - first;
            self.check_capacity(base)?;
            if self.fits(base, children) {
                return Ok(base);
            }
            slot += 1;
        }
    }

    #[inline]
    fn check_capacity(&self, base: usize) -> Result<()> {
        if base as u64 > U::MAX_BASE {
            return Err(CdatError::CapacityExceeded {
                width: U::WIDTH,
                needed: base as u64,
            });
        }
        Ok(())
    }

    fn fits(&mut self, base: usize, children: &[(u8, u32)]) -> bool {
        self.probes += 1;
        if self.used_bases.get(base).copied().unwrap_or(false) {
            return false;
        }
        children.iter().all(|&(label, _)| {
            let slot = base + label as usize;
            !self.occupied.get(slot).copied().unwrap_or(false)
        })
    }

    fn mark_base(&mut self, base: usize) {
        if base >= self.used_bases.len() {
            self.used_bases.resize(base + 1, false);
        }
        self.used_bases[base] = true;
    }

    fn extend_to(&mut self, len: usize) {
        while self.units.len() < len {
            let slot = self.units.len();
            self.units.push(0);
            self.parents.push(0);
            self.first_labels.push(0);
            self.sibling_gaps.push(0);
            self.occupied.push(false);
            self.linked.push(true);
            self.rejections.push(0);
            self.next_free.push(NIL);
            self.prev_free.push(self.free_tail);
            if self.free_tail == NIL {
                self.free_head = slot;
            } else {
                self.next_free[self.free_tail] = slot;
            }
            self.free_tail = slot;
        }
    }

    fn occupy(&mut self, slot: usize) {
        self.extend_to(slot + 1);
        debug_assert!(!self.occupied[slot]);
        self.occupied[slot] = true;
        self.unlink(slot);
    }

    fn reject(&mut self, slot: usize) {
        self.rejections[slot] += 1;
        if self.rejections[slot] >= RETIRE_AFTER {
            self.unlink(slot);
        }
    }

    fn unlink(&mut self, slot: usize) {
        if !self.linked[slot] {
            return;
        }
        self.linked[slot] = false;

        let prev = self.prev_free[slot];
        let next = self.next_free[slot];
        if prev == NIL {
            self.free_head = next;
        } else {
            self.next_free[prev] = next;
        }
        if next == NIL {
            self.free_tail = prev;
        } else {
            self.prev_free[next] = prev;
        }
        self.prev_free[slot] = NIL;
        self.next_free[slot] = NIL;
    }

    fn serialize(&self, trie: &Trie, max_length: u32, alphabet_size: u32) -> Vec<u8> {
        let num_units = self.units.len();
        let header = Header {
            version: VERSION,
            width: U::WIDTH,
            alphabet_size,
            num_keys: trie.num_keys() as u64,
            num_nodes: trie.num_nodes() as u64,
            num_units: num_units as u64,
            max_length,
        };

        let mut out = Vec::with_capacity(
            HEADER_SIZE + num_units * (2 * U::UNIT_BYTES + SIBLING_BYTES + 1),
        );
        out.extend_from_slice(&header.to_bytes());
        for &unit in &self.units {
            write_le(&mut out, unit, U::UNIT_BYTES);
        }
        for &parent in &self.parents {
            write_le(&mut out, parent, U::UNIT_BYTES);
        }
        for (&first, &gap) in self.first_labels.iter().zip(&self.sibling_gaps) {
            out.push(first);
            out.push(gap);
        }

        let mut occupied = BitVectorBuilder::with_len(num_units);
        let mut terminals = BitVectorBuilder::with_len(num_units);
        for slot in 0..num_units {
            if self.occupied[slot] {
                occupied.set(slot, true);
                if U::is_terminal(self.units[slot]) {
                    terminals.set(slot, true);
                }
            }
        }
        occupied.write_to(&mut out);
        terminals.write_to(&mut out);
        out
    }
}
