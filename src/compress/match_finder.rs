//! Hash chains for finding duplicates.
//!
//! Every position is hashed by its next three bytes. `head` maps a hash to the most recent
//! position with that hash and `chain` links each position to the previous one with the same
//! hash. `chain` is a ring indexed by position; it is larger than the lookback window, so a link
//! is only ever overwritten once its position has left the window and can no longer be matched.
//!
//! Two byte matches are only encodable at short distances, so they get a separate table keyed
//! directly by the two bytes.

use std::cmp;
use std::mem;

use crate::format::{M1_MAX_OFFSET, MAX_DISTANCE};

const HASH_BITS: usize = 14;
const HASH_SIZE: usize = 1 << HASH_BITS;
const CHAIN_SIZE: usize = 1 << 16;
const CHAIN_MASK: usize = CHAIN_SIZE - 1;
const PAIR_SIZE: usize = 1 << 16;
const NIL: usize = usize::MAX;

/// Longest match we ever look for. Longer runs are split into several matches.
pub const MAX_MATCH_LEN: usize = 0x800;

const _: () = assert!(CHAIN_SIZE > MAX_DISTANCE);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Match {
    /// The number of bytes before our cursor, where the duplicate starts.
    pub distance: usize,
    /// The number of duplicated bytes.
    pub len: usize,
}

fn hash3(input: &[u8]) -> usize {
    let mix = (((input[0] as u32) << 5 ^ input[1] as u32) << 5) ^ input[2] as u32;
    (0x9f5f_u32.wrapping_mul(mix) >> 5) as usize & (HASH_SIZE - 1)
}

fn pair_key(input: &[u8]) -> usize {
    input[0] as usize | (input[1] as usize) << 8
}

pub(crate) fn count_matching_bytes(a: &[u8], b: &[u8]) -> usize {
    const REGSIZE: usize = mem::size_of::<usize>();
    fn read_usize(b: &[u8]) -> usize {
        let mut buf = [0u8; REGSIZE];
        buf.copy_from_slice(&b[..REGSIZE]);
        usize::from_le_bytes(buf)
    }

    let mut matching_bytes = 0;
    // compare a register at a time; from_le_bytes makes the first differing byte the lowest one
    for (a, b) in a.chunks_exact(REGSIZE).zip(b.chunks_exact(REGSIZE)) {
        let xor = read_usize(a) ^ read_usize(b);
        if xor == 0 {
            matching_bytes += REGSIZE;
        } else {
            matching_bytes += (xor.trailing_zeros() / 8) as usize;
            return matching_bytes;
        }
    }

    // ran out of full registers, up to REGSIZE - 1 bytes left
    let trailing_matches = a.iter().zip(b).skip(matching_bytes).take_while(|&(a, b)| a == b).count();
    matching_bytes + trailing_matches
}

pub struct MatchFinder {
    head: Vec<usize>,
    chain: Vec<usize>,
    pairs: Vec<usize>,
    max_chain: usize,
    max_match_len: usize,
}

impl MatchFinder {
    pub fn new(max_chain: usize, max_match_len: usize) -> Self {
        MatchFinder {
            head: vec![NIL; HASH_SIZE],
            chain: vec![NIL; CHAIN_SIZE],
            pairs: vec![NIL; PAIR_SIZE],
            max_chain: cmp::max(max_chain, 1),
            max_match_len: cmp::min(cmp::max(max_match_len, 3), MAX_MATCH_LEN),
        }
    }

    /// Forget every position seen so far.
    ///
    /// `chain` is left alone: a slot is always rewritten by `insert` before `head` can lead to it.
    pub fn reset(&mut self) {
        for h in self.head.iter_mut().chain(self.pairs.iter_mut()) {
            *h = NIL;
        }
    }

    /// Record `pos` so later positions can match against it.
    pub fn insert(&mut self, input: &[u8], pos: usize) {
        let rest = &input[pos..];
        if rest.len() >= 2 {
            self.pairs[pair_key(rest)] = pos;
        }
        if rest.len() >= 3 {
            let key = hash3(rest);
            self.chain[pos & CHAIN_MASK] = mem::replace(&mut self.head[key], pos);
        }
    }

    /// Find the longest earlier occurrence of the bytes at `pos` that starts at or after
    /// `window_start`. Equally long candidates are resolved in favour of the closest one.
    ///
    /// Only matches the grammar can encode are returned: at least three bytes, or two bytes within
    /// the M1 distance.
    pub fn find_best_match(&self, input: &[u8], pos: usize, window_start: usize) -> Option<Match> {
        let limit = cmp::min(self.max_match_len, input.len().saturating_sub(pos));
        if limit < 2 {
            return None;
        }
        let current = &input[pos..pos + limit];
        let window_start = cmp::max(window_start, pos.saturating_sub(MAX_DISTANCE));

        let mut best: Option<Match> = None;
        if limit >= 3 {
            let mut candidate = self.head[hash3(current)];
            let mut budget = self.max_chain;
            // candidates come newest first, so a strict comparison keeps the closest of equals
            while candidate != NIL && candidate >= window_start && candidate < pos && budget > 0 {
                let len = count_matching_bytes(current, &input[candidate..]);
                if len >= 3 && best.map_or(true, |b| len > b.len) {
                    best = Some(Match { distance: pos - candidate, len });
                    if len == limit {
                        break;
                    }
                }
                candidate = self.chain[candidate & CHAIN_MASK];
                budget -= 1;
            }
        }

        if best.is_none() {
            let candidate = self.pairs[pair_key(current)];
            if candidate != NIL && candidate >= window_start && candidate < pos {
                let distance = pos - candidate;
                let len = count_matching_bytes(current, &input[candidate..]);
                if len >= 3 || (len == 2 && distance <= M1_MAX_OFFSET) {
                    best = Some(Match { distance, len });
                }
            }
        }

        best
    }
}
