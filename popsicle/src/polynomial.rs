// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Arithmetic modulo the plaintext modulus, and the server's polynomial
//! encoding of its bins.

use crate::params::Parameters;

/// `a · b mod modulus`.
#[inline]
pub fn mul_mod(a: u64, b: u64, modulus: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) % u128::from(modulus)) as u64
}

/// `base^exp mod modulus`.
pub fn pow_mod(base: u64, mut exp: u64, modulus: u64) -> u64 {
    let mut result = 1 % modulus;
    let mut base = base % modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    result
}

/// Coefficients `c_0, …, c_d` (lowest degree first) of the monic polynomial
/// `∏ (X − r)` over the roots, reduced mod `modulus`.
pub fn coeffs_from_roots(roots: &[u64], modulus: u64) -> Vec<u64> {
    let mut coeffs = Vec::with_capacity(roots.len() + 1);
    coeffs.push(1 % modulus);
    for &root in roots {
        let neg = (modulus - root % modulus) % modulus;
        // multiply by (X - root)
        coeffs.push(0);
        for i in (0..coeffs.len()).rev() {
            let shifted = if i > 0 { coeffs[i - 1] } else { 0 };
            coeffs[i] = (shifted + mul_mod(coeffs[i], neg, modulus)) % modulus;
        }
    }
    coeffs
}

/// Evaluate a polynomial given lowest degree first (Horner's rule).
pub fn evaluate(coeffs: &[u64], x: u64, modulus: u64) -> u64 {
    let x = x % modulus;
    coeffs
        .iter()
        .rev()
        .fold(0, |acc, c| (mul_mod(acc, x, modulus) + c) % modulus)
}

/// Split each padded bin into `α` partitions of `m` values and replace each
/// partition by the `m + 1` coefficients of the polynomial vanishing on it.
/// Row `b` of the result is the concatenation of bin `b`'s partitions.
pub fn encode_bins(bins: &[Vec<u64>], params: &Parameters) -> Vec<Vec<u64>> {
    let m = params.minibin_capacity();
    let t = params.plain_modulus;
    bins.iter()
        .map(|bin| {
            bin.chunks(m)
                .flat_map(|partition| coeffs_from_roots(partition, t))
                .collect()
        })
        .collect()
}
