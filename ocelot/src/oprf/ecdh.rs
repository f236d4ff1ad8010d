// -*- mode: rust; -*-
//
// This file is part of ocelot.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Blinded Diffie-Hellman oblivious PRF over the Ristretto group.
//!
//! The PRF is `F(k, x) = H'(k · H(x))`. The receiver sends `r · H(x)` for a
//! blinding scalar `r`, the sender answers with `k · r · H(x)`, and the
//! receiver multiplies by `r⁻¹` to obtain `k · H(x)`. Neither party sees the
//! other's secret: the sender only sees uniformly random group elements, and
//! the receiver only learns `k · H(x)` for its own inputs.
//!
//! Batch operations are embarrassingly parallel and run on the `rayon` pool;
//! each worker only reads the (immutable) key.

use crate::errors::Error;
use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use scuttlebutt::{AbstractChannel, SemiHonest};
use sha2::{Digest, Sha256, Sha512};
use std::time::Instant;

/// Size in bytes of a compressed group element.
pub const POINT_LEN: usize = 32;

/// A compressed Ristretto point, as exchanged on the wire and persisted.
pub type EncodedPoint = [u8; POINT_LEN];

// Domain separation for the hash onto the group.
const HASH_TO_POINT_DOMAIN: &[u8] = b"popsicle-ecdh-oprf-h2c";

/// A long-lived, invertible OPRF scalar. The sender uses it as the PRF key,
/// the receiver as its blinding factor.
#[derive(Clone)]
pub struct OprfKey {
    scalar: Scalar,
}

impl OprfKey {
    /// Sample a fresh nonzero key.
    pub fn random<RNG: CryptoRng + RngCore>(rng: &mut RNG) -> Self {
        loop {
            let scalar = Scalar::random(rng);
            if scalar != Scalar::ZERO {
                return Self { scalar };
            }
        }
    }

    /// Load a key from its canonical little-endian encoding.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, Error> {
        let scalar: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
        match scalar {
            Some(scalar) if scalar != Scalar::ZERO => Ok(Self { scalar }),
            _ => Err(Error::InvalidKey),
        }
    }

    /// The canonical little-endian encoding of the key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.scalar.to_bytes()
    }

    /// The public image `k · G` of the key. Identifies the key without
    /// revealing it.
    pub fn public_image(&self) -> EncodedPoint {
        RistrettoPoint::mul_base(&self.scalar).compress().to_bytes()
    }

    /// The multiplicative inverse of the key modulo the group order.
    pub fn inverse(&self) -> OprfKey {
        OprfKey {
            scalar: self.scalar.invert(),
        }
    }

    #[inline]
    fn apply(&self, point: &RistrettoPoint) -> RistrettoPoint {
        self.scalar * point
    }
}

impl std::fmt::Debug for OprfKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("OprfKey(<redacted>)")
    }
}

/// Hash an arbitrary byte string onto the group.
pub fn hash_to_point(input: &[u8]) -> RistrettoPoint {
    let mut bytes = Vec::with_capacity(HASH_TO_POINT_DOMAIN.len() + input.len());
    bytes.extend_from_slice(HASH_TO_POINT_DOMAIN);
    bytes.extend_from_slice(input);
    RistrettoPoint::hash_from_bytes::<Sha512>(&bytes)
}

/// Map a group element to a `nbits`-bit integer.
///
/// The low bit of a Ristretto encoding is always zero, so the encoding is
/// hashed before truncation.
pub fn point_to_prf(point: &RistrettoPoint, nbits: u32) -> u64 {
    debug_assert!(nbits > 0 && nbits <= 64);
    let digest = Sha256::digest(point.compress().as_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    let value = u64::from_le_bytes(word);
    if nbits == 64 {
        value
    } else {
        value & ((1u64 << nbits) - 1)
    }
}

fn decode(points: &[EncodedPoint]) -> Result<Vec<RistrettoPoint>, Error> {
    points
        .par_iter()
        .enumerate()
        .map(|(i, bytes)| {
            CompressedRistretto(*bytes)
                .decompress()
                .ok_or(Error::InvalidPoint(i))
        })
        .collect()
}

/// The party holding the PRF key.
pub struct Sender {
    key: OprfKey,
    nbits: u32,
}

impl Sender {
    /// Create a sender for key `key`, producing `nbits`-bit PRF values.
    pub fn new(key: OprfKey, nbits: u32) -> Self {
        Self { key, nbits }
    }

    /// Evaluate the PRF directly on the sender's own inputs.
    pub fn offline_evaluate<T: AsRef<[u8]> + Sync>(&self, inputs: &[T]) -> Vec<u64> {
        let start = Instant::now();
        let outputs = inputs
            .par_iter()
            .map(|x| point_to_prf(&self.key.apply(&hash_to_point(x.as_ref())), self.nbits))
            .collect::<Vec<u64>>();
        log::debug!(
            "OPRF sender :: evaluated {} inputs offline in {:?}",
            inputs.len(),
            start.elapsed()
        );
        outputs
    }

    /// Apply the key to points already blinded by the receiver.
    pub fn online_blind_evaluate(&self, blinded: &[EncodedPoint]) -> Result<Vec<EncodedPoint>, Error> {
        let start = Instant::now();
        let points = decode(blinded)?;
        let outputs = points
            .par_iter()
            .map(|p| self.key.apply(p).compress().to_bytes())
            .collect::<Vec<EncodedPoint>>();
        log::debug!(
            "OPRF sender :: evaluated {} blinded points in {:?}",
            blinded.len(),
            start.elapsed()
        );
        Ok(outputs)
    }

    /// Run the online round: read one frame of blinded points from `channel`
    /// and answer with the evaluated points. Returns the number of points.
    pub fn send<C: AbstractChannel>(&self, channel: &mut C) -> Result<usize, Error> {
        let blinded: Vec<EncodedPoint> = channel.read_message()?;
        let evaluated = self.online_blind_evaluate(&blinded)?;
        channel.write_message(&evaluated)?;
        Ok(evaluated.len())
    }
}

/// The party learning PRF values on its own inputs.
pub struct Receiver {
    key: OprfKey,
    inverse: OprfKey,
    nbits: u32,
}

impl Receiver {
    /// Create a receiver blinding with `key`, producing `nbits`-bit PRF values.
    pub fn new(key: OprfKey, nbits: u32) -> Self {
        let inverse = key.inverse();
        Self {
            key,
            inverse,
            nbits,
        }
    }

    /// The public image of the blinding key.
    pub fn key_image(&self) -> EncodedPoint {
        self.key.public_image()
    }

    /// Blind the receiver's inputs: `x ↦ r · H(x)`.
    pub fn blind<T: AsRef<[u8]> + Sync>(&self, inputs: &[T]) -> Vec<EncodedPoint> {
        let start = Instant::now();
        let blinded = inputs
            .par_iter()
            .map(|x| self.key.apply(&hash_to_point(x.as_ref())).compress().to_bytes())
            .collect::<Vec<EncodedPoint>>();
        log::debug!(
            "OPRF receiver :: blinded {} inputs in {:?}",
            inputs.len(),
            start.elapsed()
        );
        blinded
    }

    /// Strip the blinding factor from the sender's answer and map each point
    /// to its PRF value.
    pub fn unblind(&self, evaluated: &[EncodedPoint]) -> Result<Vec<u64>, Error> {
        let points = decode(evaluated)?;
        Ok(points
            .par_iter()
            .map(|p| point_to_prf(&self.inverse.apply(p), self.nbits))
            .collect())
    }

    /// Run the online round for already blinded inputs, returning the PRF
    /// values in input order.
    pub fn receive<C: AbstractChannel>(
        &self,
        channel: &mut C,
        blinded: &[EncodedPoint],
    ) -> Result<Vec<u64>, Error> {
        channel.write_message(&blinded)?;
        let evaluated: Vec<EncodedPoint> = channel.read_message()?;
        if evaluated.len() != blinded.len() {
            return Err(Error::InvalidInputLength {
                expected: blinded.len(),
                received: evaluated.len(),
            });
        }
        let start = Instant::now();
        let outputs = self.unblind(&evaluated)?;
        log::debug!(
            "OPRF receiver :: unblinded {} points in {:?}",
            outputs.len(),
            start.elapsed()
        );
        Ok(outputs)
    }
}

impl SemiHonest for Sender {}
impl SemiHonest for Receiver {}
