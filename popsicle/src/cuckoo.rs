// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use crate::{hashing::HashFunctions, params::Parameters, Error};
use rand::{CryptoRng, Rng};
use std::{collections::HashSet, fmt::Debug};

#[derive(Clone, Debug)]
pub(crate) struct CuckooItem {
    // The stored value `(left << log_no_hashes) + hash_index`.
    pub(crate) entry: u64,
    // The input index associated with the entry.
    pub(crate) input_index: usize,
    // The hash index used.
    pub(crate) hash_index: usize,
}

/// The client's cuckoo table: one PRF value per bin, each in one of its
/// candidate bins.
#[derive(Clone)]
pub struct CuckooHash {
    pub(crate) items: Vec<Option<CuckooItem>>,
    pub(crate) nbins: usize,
    hashes: HashFunctions,
    max_relocations: usize,
    dummy: u64,
}

impl CuckooHash {
    /// Build a new cuckoo hash table, hashing the PRF values `inputs` in.
    /// Repeated values are placed once, under the index of their first
    /// occurrence.
    pub fn new<RNG: CryptoRng + Rng>(
        inputs: &[u64],
        params: &Parameters,
        rng: &mut RNG,
    ) -> Result<CuckooHash, Error> {
        let nbins = params.number_of_bins();
        let mut tbl = CuckooHash {
            items: vec![None; nbins],
            nbins,
            hashes: HashFunctions::new(params),
            max_relocations: params.max_relocations(),
            dummy: params.dummy_client(),
        };
        let mut seen = HashSet::with_capacity(inputs.len());
        for (j, input) in inputs.iter().enumerate() {
            if seen.insert(*input) {
                tbl.hash(*input, j, rng)?;
            }
        }
        Ok(tbl)
    }

    /// Place `input`, alongside the input index `idx` it corresponds to, in the
    /// hash table.
    ///
    /// An empty candidate bin is taken if one exists. Otherwise the occupant
    /// of a random candidate bin is evicted and reinserted, never by the hash
    /// function that placed it. Fails after `max_relocations` evictions.
    pub fn hash<RNG: CryptoRng + Rng>(
        &mut self,
        input: u64,
        idx: usize,
        rng: &mut RNG,
    ) -> Result<(), Error> {
        let nhashes = self.hashes.nhashes();
        let mut value = input;
        let mut input_index = idx;
        let mut forbidden = None;

        for _ in 0..=self.max_relocations {
            let free = (0..nhashes).find(|&h| self.items[self.hashes.location(value, h)].is_none());
            if let Some(h) = free {
                let bin = self.hashes.location(value, h);
                self.items[bin] = Some(self.item(value, input_index, h));
                return Ok(());
            }
            let h = loop {
                let h = rng.gen_range(0..nhashes);
                if Some(h) != forbidden {
                    break h;
                }
            };
            let bin = self.hashes.location(value, h);
            let item = self.item(value, input_index, h);
            if let Some(evicted) = self.items[bin].replace(item) {
                // If there is an item already in the bin, keep iterating,
                // trying to place the evicted item.
                value = self.hashes.reconstruct(
                    evicted.entry,
                    bin,
                    self.hashes.seed(evicted.hash_index),
                );
                input_index = evicted.input_index;
                forbidden = Some(evicted.hash_index);
            } else {
                return Ok(());
            }
        }
        Err(Error::CuckooHashFull {
            relocations: self.max_relocations,
        })
    }

    fn item(&self, value: u64, input_index: usize, hash_index: usize) -> CuckooItem {
        CuckooItem {
            entry: self.hashes.left_and_index(value, hash_index),
            input_index,
            hash_index,
        }
    }

    /// The PRF value stored in bin `bin`, if any.
    pub fn reconstruct(&self, bin: usize) -> Option<u64> {
        self.items.get(bin)?.as_ref().map(|item| {
            let index = self.hashes.extract_index(item.entry);
            self.hashes
                .reconstruct(item.entry, bin, self.hashes.seed(index))
        })
    }

    /// The input index of the value stored in bin `bin`, if any.
    pub fn input_index(&self, bin: usize) -> Option<usize> {
        self.items.get(bin)?.as_ref().map(|item| item.input_index)
    }

    /// The stored value of every bin, with empty bins holding the client
    /// dummy value.
    pub fn slots(&self) -> Vec<u64> {
        self.items
            .iter()
            .map(|item| item.as_ref().map_or(self.dummy, |item| item.entry))
            .collect()
    }

    /// Number of occupied bins.
    pub fn len(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for CuckooHash {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for i in 0..self.nbins {
            if let Some(item) = &self.items[i] {
                writeln!(f, "{}: {:?}", i, item)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    const SETSIZE: usize = 5535;

    fn random_values(params: &Parameters, n: usize, rng: &mut StdRng) -> Vec<u64> {
        (0..n).map(|_| rng.gen_range(0..1u64 << params.sigma_max)).collect()
    }

    #[test]
    fn test_build() {
        let params = Parameters::derive(1 << 20, SETSIZE, 10).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let values = random_values(&params, SETSIZE, &mut rng);
        let tbl = CuckooHash::new(&values, &params, &mut rng).unwrap();
        assert_eq!(tbl.len(), SETSIZE);
        assert_eq!(tbl.slots().len(), params.number_of_bins());
    }

    #[test]
    fn hashing() {
        let params = Parameters::derive(1 << 20, SETSIZE, 10).unwrap();
        let hashes = HashFunctions::new(&params);
        let mut rng = StdRng::seed_from_u64(1);
        let values = random_values(&params, SETSIZE, &mut rng);
        let tbl = CuckooHash::new(&values, &params, &mut rng).unwrap();

        // each input sits in one of its candidate bins and can be recovered
        // from that bin alone
        let mut found = vec![false; values.len()];
        for bin in 0..tbl.nbins {
            if let Some(idx) = tbl.input_index(bin) {
                let v = values[idx];
                assert!((0..3).any(|h| hashes.location(v, h) == bin));
                assert_eq!(tbl.reconstruct(bin), Some(v));
                found[idx] = true;
            } else {
                assert_eq!(tbl.slots()[bin], params.dummy_client());
            }
        }
        assert!(found.into_iter().all(|f| f));
    }

    #[test]
    fn test_duplicates_placed_once() {
        let params = Parameters::derive(100, 10, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let tbl = CuckooHash::new(&[42, 7, 42, 42], &params, &mut rng).unwrap();
        assert_eq!(tbl.len(), 2);
    }

    #[test]
    fn test_overfull_table_fails() {
        let params = Parameters::derive(100, 10, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let values = random_values(&params, params.number_of_bins() + 1, &mut rng);
        assert!(matches!(
            CuckooHash::new(&values, &params, &mut rng),
            Err(Error::CuckooHashFull { .. })
        ));
    }
}
