// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Parameter derivation for unbalanced PSI.
//!
//! Everything both parties must agree on is a deterministic function of the
//! public set sizes, so each side derives [`Parameters`] independently and the
//! handshake compares [`Parameters::fingerprint`]s.

use crate::Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of cuckoo hash functions.
pub const NHASHES: usize = 3;

/// The BFV plaintext modulus. Prime, and `1 mod 2N` for every supported `N`.
pub const PLAIN_MODULUS: u64 = 536_903_681;

/// Seeds of the three location hash functions.
pub const HASH_SEEDS: [u64; NHASHES] = [123_456_789, 10_111_213_141_516, 17_181_920_212_223];

/// Windowing uses base `2^ELL`.
pub const ELL: u32 = 2;

/// Bit size of the PRF output before the location bits are stripped.
const SIGMA_BASE: u32 = 29;

// Bits of a stored value taken by the hash index.
const LOG_NO_HASHES: u32 = usize::BITS - NHASHES.leading_zeros();

// Numbers taken from <https://thomaschneider.de/papers/PSZ18.pdf>, §3.2.2.
const CUCKOO_EXPANSION: f64 = 1.27;

const POLY_MODULUS_DEGREES: [usize; 2] = [1 << 13, 1 << 14];

const MODULUS_BITS: usize = 54;

// (log2 of the largest server set, bin capacity, partitions per bin).
const TIERS: [(u32, usize, usize); 7] = [
    (8, 8, 2),
    (12, 20, 2),
    (16, 68, 4),
    (18, 176, 8),
    (20, 544, 16),
    (22, 1840, 40),
    (24, 6728, 116),
];

/// The agreed parameter set of one PSI instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    /// Upper bound on the number of distinct server elements.
    pub server_size: usize,
    /// Upper bound on the number of distinct client elements.
    pub client_size: usize,
    /// Expected intersection size. Informational only.
    pub intersection_size: usize,
    /// BFV ring degree `N`; also the number of hash bins.
    pub poly_modulus_degree: usize,
    /// Bit sizes of the BFV ciphertext moduli.
    pub moduli_sizes: Vec<usize>,
    /// The BFV plaintext modulus `t`.
    pub plain_modulus: u64,
    /// `log2 N`.
    pub output_bits: u32,
    /// Bit size of PRF values.
    pub sigma_max: u32,
    /// Seeds of the location hash functions.
    pub hash_seeds: Vec<u64>,
    /// Number of server values held per bin, `B`.
    pub bin_capacity: usize,
    /// Number of partitions each bin is split into, `α`.
    pub alpha: usize,
    /// The windowing base is `2^ell`.
    pub ell: u32,
}

impl Parameters {
    /// Derive the parameter set for the given public sizes.
    pub fn derive(
        server_size: usize,
        client_size: usize,
        intersection_size: usize,
    ) -> Result<Self, Error> {
        if server_size == 0 || client_size == 0 {
            return Err(Error::InvalidParameters(
                "set sizes must be positive".to_string(),
            ));
        }
        if intersection_size > server_size.min(client_size) {
            return Err(Error::InvalidParameters(format!(
                "intersection size {} exceeds a set size",
                intersection_size
            )));
        }
        let (_, bin_capacity, alpha) = TIERS
            .iter()
            .find(|(logn, _, _)| server_size <= 1 << logn)
            .copied()
            .ok_or_else(|| {
                Error::InvalidParameters(format!(
                    "no parameter tier for {} server elements",
                    server_size
                ))
            })?;
        let needed = (CUCKOO_EXPANSION * client_size as f64).ceil() as usize;
        let poly_modulus_degree = POLY_MODULUS_DEGREES
            .iter()
            .copied()
            .find(|n| needed <= *n)
            .ok_or_else(|| {
                Error::InvalidParameters(format!(
                    "{} client elements need {} bins, more than the largest ring degree",
                    client_size, needed
                ))
            })?;
        let output_bits = poly_modulus_degree.trailing_zeros();
        let nmoduli = if poly_modulus_degree == 1 << 13 { 4 } else { 8 };
        let params = Parameters {
            server_size,
            client_size,
            intersection_size,
            poly_modulus_degree,
            moduli_sizes: vec![MODULUS_BITS; nmoduli],
            plain_modulus: PLAIN_MODULUS,
            output_bits,
            sigma_max: SIGMA_BASE + output_bits - LOG_NO_HASHES,
            hash_seeds: HASH_SEEDS.to_vec(),
            bin_capacity,
            alpha,
            ell: ELL,
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), Error> {
        let fail = |s: &str| Err(Error::InvalidParameters(s.to_string()));
        if !self.poly_modulus_degree.is_power_of_two() {
            return fail("ring degree is not a power of two");
        }
        if self.plain_modulus % (2 * self.poly_modulus_degree as u64) != 1 {
            return fail("plaintext modulus does not support batching");
        }
        if self.alpha == 0 || self.bin_capacity % self.alpha != 0 {
            return fail("bin capacity is not a multiple of the partition count");
        }
        if self.hash_seeds.len() < 2 {
            return fail("at least two hash functions are required");
        }
        if self.sigma_max <= self.output_bits || self.sigma_max >= 64 {
            return fail("PRF width is out of range");
        }
        if self.dummy_server() >= self.plain_modulus {
            return fail("dummy values do not fit below the plaintext modulus");
        }
        Ok(())
    }

    /// Number of hash bins, equal to the number of batching slots.
    #[inline]
    pub fn number_of_bins(&self) -> usize {
        self.poly_modulus_degree
    }

    /// Number of server values per partition, `m = B / α`.
    #[inline]
    pub fn minibin_capacity(&self) -> usize {
        self.bin_capacity / self.alpha
    }

    /// The windowing base `b = 2^ell`.
    #[inline]
    pub fn base(&self) -> usize {
        1 << self.ell
    }

    /// Number of hash functions.
    #[inline]
    pub fn nhashes(&self) -> usize {
        self.hash_seeds.len()
    }

    /// Bits reserved in a stored value for the hash index, `⌊log2 h⌋ + 1`.
    #[inline]
    pub fn log_no_hashes(&self) -> u32 {
        usize::BITS - self.nhashes().leading_zeros()
    }

    /// Number of base-`b` digits of `m`.
    pub fn windows(&self) -> usize {
        let base = self.base();
        let mut m = self.minibin_capacity();
        let mut windows = 0;
        while m > 0 {
            m /= base;
            windows += 1;
        }
        windows
    }

    /// Exclusive upper bound on stored hash table values.
    #[inline]
    pub fn stored_value_bound(&self) -> u64 {
        1 << (self.sigma_max - self.output_bits + self.log_no_hashes())
    }

    /// The value padding empty client slots.
    #[inline]
    pub fn dummy_client(&self) -> u64 {
        self.stored_value_bound()
    }

    /// The value padding server bins. Never equal to `dummy_client`.
    #[inline]
    pub fn dummy_server(&self) -> u64 {
        self.stored_value_bound() + 1
    }

    /// Upper bound on cuckoo evictions per insertion.
    #[inline]
    pub fn max_relocations(&self) -> usize {
        8 * self.output_bits as usize
    }

    /// SHA-256 over a canonical encoding of every field.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"popsicle-unbalanced-psi-parameters");
        for x in [
            self.server_size as u64,
            self.client_size as u64,
            self.intersection_size as u64,
            self.poly_modulus_degree as u64,
            self.plain_modulus,
            u64::from(self.output_bits),
            u64::from(self.sigma_max),
            self.bin_capacity as u64,
            self.alpha as u64,
            u64::from(self.ell),
        ] {
            hasher.update(x.to_le_bytes());
        }
        hasher.update((self.moduli_sizes.len() as u64).to_le_bytes());
        for size in &self.moduli_sizes {
            hasher.update((*size as u64).to_le_bytes());
        }
        hasher.update((self.hash_seeds.len() as u64).to_le_bytes());
        for seed in &self.hash_seeds {
            hasher.update(seed.to_le_bytes());
        }
        hasher.finalize().into()
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        writeln!(
            f,
            "sizes: server {} / client {} / intersection {}",
            self.server_size, self.client_size, self.intersection_size
        )?;
        writeln!(
            f,
            "BFV: N = {}, t = {}, moduli bits = {:?}",
            self.poly_modulus_degree, self.plain_modulus, self.moduli_sizes
        )?;
        writeln!(
            f,
            "hashing: {} bins, {} hashes, sigma_max = {}",
            self.number_of_bins(),
            self.nhashes(),
            self.sigma_max
        )?;
        write!(
            f,
            "matching: B = {}, alpha = {}, m = {}, base = {}, windows = {}",
            self.bin_capacity,
            self.alpha,
            self.minibin_capacity(),
            self.base(),
            self.windows()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_small() {
        let p = Parameters::derive(6, 3, 3).unwrap();
        assert_eq!(p.poly_modulus_degree, 8192);
        assert_eq!(p.output_bits, 13);
        assert_eq!(p.sigma_max, 40);
        assert_eq!(p.log_no_hashes(), 2);
        assert_eq!(p.minibin_capacity(), 4);
        assert_eq!(p.windows(), 2);
        assert_eq!(p.dummy_client(), 1 << 29);
        assert_eq!(p.dummy_server(), (1 << 29) + 1);
    }

    #[test]
    fn test_tiers() {
        assert_eq!(Parameters::derive(1 << 16, 10, 0).unwrap().minibin_capacity(), 17);
        assert_eq!(Parameters::derive(1 << 20, 5535, 10).unwrap().minibin_capacity(), 34);
        assert_eq!(Parameters::derive(1 << 20, 5535, 10).unwrap().windows(), 3);
        for (logn, b, alpha) in TIERS {
            let p = Parameters::derive(1 << logn, 1, 0).unwrap();
            assert_eq!((p.bin_capacity, p.alpha), (b, alpha));
        }
    }

    #[test]
    fn test_ring_degree_grows_with_client() {
        assert_eq!(Parameters::derive(100, 6450, 0).unwrap().poly_modulus_degree, 8192);
        let p = Parameters::derive(100, 6451, 0).unwrap();
        assert_eq!(p.poly_modulus_degree, 16384);
        assert_eq!(p.moduli_sizes.len(), 8);
        assert_eq!(p.sigma_max, 41);
        assert!(Parameters::derive(100, 13000, 0).is_err());
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(Parameters::derive(0, 1, 0), Err(Error::InvalidParameters(_))));
        assert!(matches!(Parameters::derive(10, 5, 6), Err(Error::InvalidParameters(_))));
        assert!(matches!(
            Parameters::derive((1 << 24) + 1, 5, 0),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_stored_values_fit_plaintext() {
        for client_size in [3, 6451] {
            let p = Parameters::derive(6, client_size, 0).unwrap();
            assert_eq!(p.log_no_hashes(), LOG_NO_HASHES);
            assert_eq!(p.stored_value_bound(), 1 << SIGMA_BASE);
            assert!(p.dummy_server() < p.plain_modulus);
        }
    }

    #[test]
    fn test_fingerprint() {
        let a = Parameters::derive(1000, 10, 1).unwrap();
        assert_eq!(a.fingerprint(), Parameters::derive(1000, 10, 1).unwrap().fingerprint());
        assert_ne!(a.fingerprint(), Parameters::derive(1000, 11, 1).unwrap().fingerprint());
    }
}
