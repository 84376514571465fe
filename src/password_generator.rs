use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::candidate::Candidate;

pub const DEFAULT_CHARSET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const DEFAULT_MAX_LENGTH: usize = 8;

/// Enumerates every string over an alphabet, shortest first.
///
/// Within one length the order is lexicographic by alphabet position, with
/// the last character changing fastest: `"", "a", "b", "aa", "ab", "ba", "bb"`.
/// Indices always start at 0; this source is never resumed.
pub struct PasswordGenerator {
    alphabet: Vec<char>,
    max_length: usize,
    // Alphabet positions of the next password; None once exhausted
    positions: Option<Vec<usize>>,
    next_index: u64,
}

impl PasswordGenerator {
    pub fn new(charset: &str, max_length: usize) -> Self {
        let mut alphabet: Vec<char> = Vec::new();
        for c in charset.chars() {
            if !alphabet.contains(&c) {
                alphabet.push(c);
            }
        }

        PasswordGenerator {
            alphabet,
            max_length,
            positions: Some(Vec::new()),
            next_index: 0,
        }
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Number of candidates the full enumeration yields: sum of A^r for r in 0..=L
    pub fn total_candidates(&self) -> BigUint {
        let base = BigUint::from(self.alphabet.len());
        let mut total = BigUint::zero();
        let mut power = BigUint::one();
        for _ in 0..=self.max_length {
            total += &power;
            power *= &base;
        }
        total
    }

    fn advance(&mut self) {
        let Some(positions) = self.positions.as_mut() else {
            return;
        };

        // Odometer increment from the rightmost position
        for slot in positions.iter_mut().rev() {
            *slot += 1;
            if *slot < self.alphabet.len() {
                return;
            }
            *slot = 0;
        }

        // Every position wrapped: move on to the next length
        let next_len = positions.len() + 1;
        if next_len > self.max_length || self.alphabet.is_empty() {
            self.positions = None;
        } else {
            *positions = vec![0; next_len];
        }
    }
}

impl Iterator for PasswordGenerator {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let positions = self.positions.as_ref()?;
        let password: String = positions.iter().map(|&p| self.alphabet[p]).collect();
        let candidate = Candidate::new(password, self.next_index);

        self.next_index += 1;
        self.advance();
        Some(candidate)
    }
}
