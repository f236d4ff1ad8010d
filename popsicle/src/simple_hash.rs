// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! The server's replicated hash table. Every PRF value lands in the bin of
//! each location hash function, padded to a fixed capacity before encoding.

use crate::{hashing::HashFunctions, params::Parameters, Error};

/// The server's hash table: every PRF value is placed in all of its
/// candidate bins, each bin holding at most `bin_capacity` values.
#[derive(Clone, Debug)]
pub struct SimpleHash {
    bins: Vec<Vec<u64>>,
    capacity: usize,
    hashes: HashFunctions,
}

impl SimpleHash {
    /// An empty table for `params`.
    pub fn new(params: &Parameters) -> Self {
        Self {
            bins: vec![Vec::new(); params.number_of_bins()],
            capacity: params.bin_capacity,
            hashes: HashFunctions::new(params),
        }
    }

    /// Build the table from distinct PRF values.
    pub fn build(inputs: &[u64], params: &Parameters) -> Result<Self, Error> {
        let mut tbl = Self::new(params);
        for &input in inputs {
            for h in 0..tbl.hashes.nhashes() {
                tbl.insert(input, h)?;
            }
        }
        Ok(tbl)
    }

    /// Store `input` in its bin under hash function `index`.
    pub fn insert(&mut self, input: u64, index: usize) -> Result<(), Error> {
        let bin = self.hashes.location(input, index);
        if self.bins[bin].len() == self.capacity {
            return Err(Error::BinOverflow {
                bin,
                capacity: self.capacity,
            });
        }
        self.bins[bin].push(self.hashes.left_and_index(input, index));
        Ok(())
    }

    /// Number of values stored in bin `bin`.
    pub fn occupancy(&self, bin: usize) -> usize {
        self.bins[bin].len()
    }

    /// The largest bin occupancy.
    pub fn max_occupancy(&self) -> usize {
        self.bins.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// The bins, each padded to capacity with `dummy`.
    pub fn padded(self, dummy: u64) -> Vec<Vec<u64>> {
        let capacity = self.capacity;
        self.bins
            .into_iter()
            .map(|mut bin| {
                bin.resize(capacity, dummy);
                bin
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_every_value_in_every_candidate_bin() {
        let params = Parameters::derive(1 << 12, 100, 0).unwrap();
        let hashes = HashFunctions::new(&params);
        let mut rng = StdRng::seed_from_u64(0);
        let values: Vec<u64> = (0..1 << 12)
            .map(|_| rng.gen_range(0..1u64 << params.sigma_max))
            .collect();
        let tbl = SimpleHash::build(&values, &params).unwrap();
        assert!(tbl.max_occupancy() <= params.bin_capacity);
        let bins = tbl.padded(params.dummy_server());
        for v in values {
            for h in 0..3 {
                let stored = hashes.left_and_index(v, h);
                assert!(bins[hashes.location(v, h)].contains(&stored));
            }
        }
        assert!(bins.iter().all(|bin| bin.len() == params.bin_capacity));
    }

    #[test]
    fn test_overflow_is_fatal() {
        let params = Parameters::derive(10, 10, 0).unwrap();
        let hashes = HashFunctions::new(&params);
        let mut tbl = SimpleHash::new(&params);
        // values sharing `left` land in the same bin under hash 0 when their
        // low bits agree, so vary only the bits above `output_bits`
        let target = hashes.location(0, 0);
        let mut inserted = 0;
        let mut left = 0u64;
        let err = loop {
            let high = left << params.output_bits;
            let v = high | (hashes.location(high, 0) ^ target) as u64;
            left += 1;
            assert_eq!(hashes.location(v, 0), target);
            match tbl.insert(v, 0) {
                Ok(()) => inserted += 1,
                Err(e) => break e,
            }
        };
        assert_eq!(inserted, params.bin_capacity);
        assert_eq!(tbl.occupancy(target), params.bin_capacity);
        assert!(matches!(err, Error::BinOverflow { bin, capacity } if bin == target && capacity == 8));
    }
}
