// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Permutation-based location hashing shared by the client's cuckoo table and
//! the server's simple hash table.
//!
//! A PRF value `v` is split into `left = v >> output_bits` and the low
//! `output_bits` bits `right`. Hash function `j` sends `v` to bin
//! `H_j(left) ^ right` and stores `(left << log_no_hashes) + j` there, so a
//! stored value together with its bin determines `v` again.

use crate::params::Parameters;
use std::hash::Hasher;
use twox_hash::Xxh3Hash64;

/// The location hash functions of one parameter set.
#[derive(Clone, Debug)]
pub struct HashFunctions {
    seeds: Vec<u64>,
    output_bits: u32,
    log_no_hashes: u32,
}

impl HashFunctions {
    /// The hash functions of `params`.
    pub fn new(params: &Parameters) -> Self {
        Self {
            seeds: params.hash_seeds.clone(),
            output_bits: params.output_bits,
            log_no_hashes: params.log_no_hashes(),
        }
    }

    /// Number of hash functions.
    #[inline]
    pub fn nhashes(&self) -> usize {
        self.seeds.len()
    }

    #[inline]
    fn mask(&self) -> u64 {
        (1 << self.output_bits) - 1
    }

    // The top `output_bits` bits of a seeded 64-bit hash of `left`.
    fn hash_left(&self, seed: u64, left: u64) -> u64 {
        let mut hasher = Xxh3Hash64::with_seed(seed);
        hasher.write(&left.to_le_bytes());
        hasher.finish() >> (64 - self.output_bits)
    }

    /// The bin of `value` under hash function `index`.
    #[inline]
    pub fn location(&self, value: u64, index: usize) -> usize {
        let left = value >> self.output_bits;
        let right = value & self.mask();
        (self.hash_left(self.seeds[index], left) ^ right) as usize
    }

    /// The value stored for `value` when placed by hash function `index`.
    #[inline]
    pub fn left_and_index(&self, value: u64, index: usize) -> u64 {
        ((value >> self.output_bits) << self.log_no_hashes) + index as u64
    }

    /// The hash index encoded in a stored value.
    #[inline]
    pub fn extract_index(&self, stored: u64) -> usize {
        (stored & ((1 << self.log_no_hashes) - 1)) as usize
    }

    /// Recover the PRF value behind `stored`, found in bin `location`, given
    /// the seed of the hash function that placed it.
    #[inline]
    pub fn reconstruct(&self, stored: u64, location: usize, seed: u64) -> u64 {
        let left = stored >> self.log_no_hashes;
        let right = self.hash_left(seed, left) ^ location as u64;
        (left << self.output_bits) | right
    }

    /// The seed of hash function `index`.
    #[inline]
    pub fn seed(&self, index: usize) -> u64 {
        self.seeds[index]
    }
}
