// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! BFV key material for the matching phase.
//!
//! The client owns the secret key. The server only ever holds a
//! [`PublicContext`]: the parameter fingerprint and the relinearization key
//! needed to multiply the client's ciphertexts.

use crate::{params::Parameters, Error};
use fhe::bfv::{
    BfvParameters, BfvParametersBuilder, Ciphertext, Encoding, Plaintext, RelinearizationKey,
    SecretKey,
};
use fhe_traits::{
    DeserializeParametrized, FheDecoder, FheDecrypter, FheEncoder, FheEncrypter, Serialize as _,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The BFV parameters of `params`.
pub fn bfv_parameters(params: &Parameters) -> Result<Arc<BfvParameters>, Error> {
    let bfv = BfvParametersBuilder::new()
        .set_degree(params.poly_modulus_degree)
        .set_plaintext_modulus(params.plain_modulus)
        .set_moduli_sizes(&params.moduli_sizes)
        .build()?;
    Ok(Arc::new(bfv))
}

/// What the client shares with the server so it can evaluate on ciphertexts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicContext {
    /// Fingerprint of the parameters the keys were generated under.
    pub fingerprint: [u8; 32],
    /// The serialized relinearization key.
    pub relinearization_key: Vec<u8>,
}

/// The client's BFV keys.
pub struct ClientContext {
    bfv: Arc<BfvParameters>,
    secret_key: SecretKey,
    fingerprint: [u8; 32],
}

impl ClientContext {
    /// Generate fresh keys under `params`.
    pub fn new<RNG: CryptoRng + RngCore>(params: &Parameters, rng: &mut RNG) -> Result<Self, Error> {
        let bfv = bfv_parameters(params)?;
        let secret_key = SecretKey::random(&bfv, rng);
        Ok(Self {
            bfv,
            secret_key,
            fingerprint: params.fingerprint(),
        })
    }

    /// Derive the context shared with the server.
    pub fn public_context<RNG: CryptoRng + RngCore>(
        &self,
        rng: &mut RNG,
    ) -> Result<PublicContext, Error> {
        let rk = RelinearizationKey::new(&self.secret_key, rng)?;
        Ok(PublicContext {
            fingerprint: self.fingerprint,
            relinearization_key: rk.to_bytes(),
        })
    }

    /// Batch-encode and encrypt one value per slot.
    #[allow(clippy::ptr_arg)]
    pub fn encrypt<RNG: CryptoRng + RngCore>(
        &self,
        slots: &Vec<u64>,
        rng: &mut RNG,
    ) -> Result<Ciphertext, Error> {
        let pt = Plaintext::try_encode(slots, Encoding::simd(), &self.bfv)?;
        Ok(self.secret_key.try_encrypt(&pt, rng)?)
    }

    /// Decrypt and batch-decode a ciphertext.
    pub fn decrypt(&self, ct: &Ciphertext) -> Result<Vec<u64>, Error> {
        let pt = self.secret_key.try_decrypt(ct)?;
        Ok(Vec::<u64>::try_decode(&pt, Encoding::simd())?)
    }

    /// Parse a ciphertext produced under these parameters.
    pub fn ciphertext_from_bytes(&self, bytes: &[u8]) -> Result<Ciphertext, Error> {
        Ok(Ciphertext::from_bytes(bytes, &self.bfv)?)
    }
}

/// The server's view of the client's keys.
pub struct ServerContext {
    bfv: Arc<BfvParameters>,
    relinearization_key: RelinearizationKey,
}

impl ServerContext {
    /// Load a client's public context, checking it was built for `params`.
    ///
    /// Ciphertexts parsed by this context belong to `bfv`, which must be the
    /// instance the server's plaintexts were encoded under.
    pub fn new(
        params: &Parameters,
        bfv: &Arc<BfvParameters>,
        public: &PublicContext,
    ) -> Result<Self, Error> {
        if public.fingerprint != params.fingerprint() {
            return Err(Error::ParameterMismatch);
        }
        let relinearization_key = RelinearizationKey::from_bytes(&public.relinearization_key, bfv)?;
        Ok(Self {
            bfv: bfv.clone(),
            relinearization_key,
        })
    }

    /// The BFV parameters ciphertexts are parsed under.
    pub fn bfv(&self) -> &Arc<BfvParameters> {
        &self.bfv
    }

    /// Multiply two ciphertexts and relinearize the product.
    pub fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, Error> {
        let mut product = a * b;
        self.relinearization_key.relinearizes(&mut product)?;
        Ok(product)
    }

    /// Parse a ciphertext produced under these parameters.
    pub fn ciphertext_from_bytes(&self, bytes: &[u8]) -> Result<Ciphertext, Error> {
        Ok(Ciphertext::from_bytes(bytes, &self.bfv)?)
    }
}

/// Batch-encode one value per slot.
#[allow(clippy::ptr_arg)]
pub fn encode(values: &Vec<u64>, bfv: &Arc<BfvParameters>) -> Result<Plaintext, Error> {
    Ok(Plaintext::try_encode(values, Encoding::simd(), bfv)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        polynomial::pow_mod,
        windowing::{power_reconstruct, window_slots},
    };
    use fhe_traits::Serialize as _;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::BTreeMap;

    #[test]
    fn test_encrypt_decrypt() {
        let params = Parameters::derive(6, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let client = ClientContext::new(&params, &mut rng).unwrap();
        let slots: Vec<u64> = (0..params.number_of_bins() as u64).collect();
        let ct = client.encrypt(&slots, &mut rng).unwrap();
        let ct = client.ciphertext_from_bytes(&ct.to_bytes()).unwrap();
        assert_eq!(client.decrypt(&ct).unwrap(), slots);
    }

    #[test]
    fn test_foreign_context_rejected() {
        let params = Parameters::derive(6, 3, 3).unwrap();
        let other = Parameters::derive(7, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let client = ClientContext::new(&params, &mut rng).unwrap();
        let public = client.public_context(&mut rng).unwrap();
        let bfv = bfv_parameters(&other).unwrap();
        assert!(matches!(
            ServerContext::new(&other, &bfv, &public),
            Err(Error::ParameterMismatch)
        ));
    }

    // The deepest ladder exercised by the protocol at `N = 8192`: `m = 22`,
    // where `y^21` needs two levels of multiplication.
    #[test]
    fn test_encrypted_power_reconstruct() {
        let params = Parameters::derive(1 << 18, 100, 0).unwrap();
        assert_eq!(params.minibin_capacity(), 22);
        let t = params.plain_modulus;
        let mut rng = StdRng::seed_from_u64(2);
        let client = ClientContext::new(&params, &mut rng).unwrap();
        let bfv = bfv_parameters(&params).unwrap();
        let server =
            ServerContext::new(&params, &bfv, &client.public_context(&mut rng).unwrap()).unwrap();

        let mut slots = vec![0u64; params.number_of_bins()];
        slots[0] = 2;
        slots[1] = params.dummy_client();
        slots[2] = t - 1;
        slots[3] = 123_456_789;
        let rungs = window_slots(&slots, &params)
            .into_iter()
            .map(|(rung, column)| {
                let ct = client.encrypt(&column, &mut rng)?;
                Ok((rung, server.ciphertext_from_bytes(&ct.to_bytes())?))
            })
            .collect::<Result<BTreeMap<_, _>, Error>>()
            .unwrap();
        let powers = power_reconstruct(&rungs, params.minibin_capacity(), params.base(), |a, b| {
            server.multiply(a, b)
        })
        .unwrap();
        for (i, ct) in powers.iter().enumerate() {
            let ct = client.ciphertext_from_bytes(&ct.to_bytes()).unwrap();
            let decrypted = client.decrypt(&ct).unwrap();
            for (slot, y) in slots.iter().take(4).enumerate() {
                assert_eq!(decrypted[slot], pow_mod(*y, i as u64 + 1, t), "y^{}", i + 1);
            }
        }
    }
}
