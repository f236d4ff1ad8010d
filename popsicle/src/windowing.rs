// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Windowed powers.
//!
//! Instead of encrypting every power `y^1, …, y^m` of a slot value, the client
//! sends the *rungs* `y^((i+1)·b^j)` for `1 ≤ i+1 < b` and every window `j`
//! with `(i+1)·b^j ≤ m`. Any `y^e` with `e ≤ m` is a product of the rungs
//! selected by the base-`b` digits of `e`. The server multiplies them in a
//! balanced tree, so the depth of `y^e` is `⌈log2 k⌉` for `k` nonzero digits.

use crate::{params::Parameters, polynomial::pow_mod, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rung of the ladder: the power `(digit + 1) · base^window`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rung {
    /// The digit minus one.
    pub digit: usize,
    /// The window index.
    pub window: usize,
}

impl Rung {
    /// The exponent this rung carries.
    pub fn exponent(&self, base: usize) -> usize {
        (self.digit + 1) * base.pow(self.window as u32)
    }
}

/// The rungs sent for `params`, ordered by window and then by digit.
pub fn ladder(params: &Parameters) -> Vec<Rung> {
    let base = params.base();
    let m = params.minibin_capacity();
    let mut rungs = Vec::new();
    for window in 0..params.windows() {
        for digit in 0..base - 1 {
            let rung = Rung { digit, window };
            if rung.exponent(base) <= m {
                rungs.push(rung);
            }
        }
    }
    rungs
}

/// Little-endian base-`base` digits of `e`.
pub fn digits(mut e: usize, base: usize) -> Vec<usize> {
    let mut out = Vec::new();
    while e > 0 {
        out.push(e % base);
        e /= base;
    }
    out
}

/// The rung values of a single slot value, `v^((i+1)·b^j) mod t`.
pub fn windowing(value: u64, params: &Parameters) -> BTreeMap<Rung, u64> {
    let base = params.base();
    ladder(params)
        .into_iter()
        .map(|rung| {
            let e = rung.exponent(base) as u64;
            (rung, pow_mod(value, e, params.plain_modulus))
        })
        .collect()
}

/// Windowing applied slot-wise: for every rung, the vector of that rung's
/// values over all `slots`.
pub fn window_slots(slots: &[u64], params: &Parameters) -> BTreeMap<Rung, Vec<u64>> {
    let mut batched: BTreeMap<Rung, Vec<u64>> = ladder(params)
        .into_iter()
        .map(|rung| (rung, Vec::with_capacity(slots.len())))
        .collect();
    for &slot in slots {
        for (rung, value) in windowing(slot, params) {
            if let Some(column) = batched.get_mut(&rung) {
                column.push(value);
            }
        }
    }
    batched
}

// How `y^e` is obtained: straight from a rung, or as the product of two
// smaller powers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Rung(Rung),
    Product(usize, usize),
}

fn plan(e: usize, base: usize) -> Option<Step> {
    let terms: Vec<(Rung, usize)> = digits(e, base)
        .into_iter()
        .enumerate()
        .filter(|(_, d)| *d != 0)
        .map(|(window, d)| {
            let rung = Rung {
                digit: d - 1,
                window,
            };
            (rung, rung.exponent(base))
        })
        .collect();
    match terms.len() {
        0 => None,
        1 => Some(Step::Rung(terms[0].0)),
        k => {
            let low: usize = terms[..k / 2].iter().map(|(_, x)| x).sum();
            Some(Step::Product(low, e - low))
        }
    }
}

/// Multiplicative depth of `y^e` built from rungs.
pub fn depth(e: usize, base: usize) -> u32 {
    match plan(e, base) {
        Some(Step::Product(lo, hi)) => 1 + depth(lo, base).max(depth(hi, base)),
        _ => 0,
    }
}

/// Compute `y^1, …, y^m` from the rungs of `y`, multiplying with `mul`.
///
/// Every power is one multiplication of two smaller powers, so the whole
/// ladder costs at most `m − |rungs|` multiplications. Fails when a needed
/// rung is missing.
pub fn power_reconstruct<T: Clone, F>(
    rungs: &BTreeMap<Rung, T>,
    m: usize,
    base: usize,
    mut mul: F,
) -> Result<Vec<T>, Error>
where
    F: FnMut(&T, &T) -> Result<T, Error>,
{
    let mut powers: Vec<T> = Vec::with_capacity(m);
    for e in 1..=m {
        let power = match plan(e, base) {
            Some(Step::Rung(rung)) => rungs.get(&rung).cloned().ok_or_else(|| {
                Error::PsiProtocolError(format!("query lacks the rung for y^{}", e))
            })?,
            Some(Step::Product(lo, hi)) => mul(&powers[lo - 1], &powers[hi - 1])?,
            None => unreachable!("exponents start at one"),
        };
        powers.push(power);
    }
    Ok(powers)
}
