// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Homomorphic evaluation of the server's partition polynomials on the
//! client's encrypted slots.

use crate::{
    he::{self, ServerContext},
    params::Parameters,
    windowing::{ladder, power_reconstruct, Rung},
    Error,
};
use fhe::bfv::{self, BfvParameters, Ciphertext, Plaintext};
use rayon::prelude::*;
use std::{collections::BTreeMap, sync::Arc, time::Instant};

/// The server's polynomial coefficients, batch-encoded: one plaintext per
/// partition and degree, slot `b` holding bin `b`'s coefficient.
pub struct Database {
    bfv: Arc<BfvParameters>,
    // partitions[j][k]: coefficient of X^k in partition j.
    partitions: Vec<Vec<Plaintext>>,
}

impl Database {
    /// Batch-encode the rows produced by [`crate::polynomial::encode_bins`].
    pub fn encode(coefficients: &[Vec<u64>], params: &Parameters) -> Result<Self, Error> {
        let width = params.minibin_capacity() + 1;
        if coefficients.len() != params.number_of_bins()
            || coefficients.iter().any(|row| row.len() != params.alpha * width)
        {
            return Err(Error::PsiProtocolError(
                "preprocessed coefficients do not match the parameters".to_string(),
            ));
        }
        let start = Instant::now();
        let bfv = he::bfv_parameters(params)?;
        let partitions = (0..params.alpha)
            .into_par_iter()
            .map(|j| {
                (0..width)
                    .map(|k| {
                        let column = coefficients
                            .iter()
                            .map(|row| row[j * width + k])
                            .collect::<Vec<u64>>();
                        he::encode(&column, &bfv)
                    })
                    .collect::<Result<Vec<Plaintext>, Error>>()
            })
            .collect::<Result<Vec<Vec<Plaintext>>, Error>>()?;
        log::debug!(
            "encoded {} x {} plaintexts in {:?}",
            params.alpha,
            width,
            start.elapsed()
        );
        Ok(Self { bfv, partitions })
    }

    /// The BFV parameters the plaintexts are encoded under. Queries must be
    /// parsed by a [`ServerContext`] sharing this instance.
    pub fn bfv(&self) -> &Arc<BfvParameters> {
        &self.bfv
    }

    /// Number of partitions, and so of response ciphertexts.
    pub fn npartitions(&self) -> usize {
        self.partitions.len()
    }

    /// Evaluate every partition polynomial on the query. Slot `b` of the
    /// `j`-th result decrypts to zero iff the client's slot `b` is a root of
    /// partition `j` of bin `b`.
    pub fn evaluate(
        &self,
        context: &ServerContext,
        query: &BTreeMap<Rung, Ciphertext>,
        params: &Parameters,
    ) -> Result<Vec<Ciphertext>, Error> {
        if !Arc::ptr_eq(context.bfv(), &self.bfv) {
            return Err(Error::PsiProtocolError(
                "query context was not built from this database".to_string(),
            ));
        }
        let start = Instant::now();
        let powers = power_reconstruct(query, params.minibin_capacity(), params.base(), |a, b| {
            context.multiply(a, b)
        })?;
        log::debug!("reconstructed {} powers in {:?}", powers.len(), start.elapsed());

        let start = Instant::now();
        let mut responses = Vec::with_capacity(self.partitions.len());
        for coeffs in &self.partitions {
            let mut acc = bfv::dot_product_scalar(powers.iter(), coeffs[1..].iter())?;
            acc += &coeffs[0];
            responses.push(acc);
        }
        log::debug!(
            "evaluated {} partitions in {:?}",
            responses.len(),
            start.elapsed()
        );
        Ok(responses)
    }
}

/// Parse the rungs of a query, requiring exactly the ladder of `params`.
pub fn decode_query(
    context: &ServerContext,
    query: &[(Rung, Vec<u8>)],
    params: &Parameters,
) -> Result<BTreeMap<Rung, Ciphertext>, Error> {
    let expected = ladder(params);
    let mut rungs = BTreeMap::new();
    for (rung, bytes) in query {
        let ct = context.ciphertext_from_bytes(bytes)?;
        if rungs.insert(*rung, ct).is_some() {
            return Err(Error::PsiProtocolError(format!("rung {:?} sent twice", rung)));
        }
    }
    if rungs.len() != expected.len() || expected.iter().any(|rung| !rungs.contains_key(rung)) {
        return Err(Error::PsiProtocolError(format!(
            "query carries {} rungs, expected {}",
            rungs.len(),
            expected.len()
        )));
    }
    Ok(rungs)
}

/// Slots at which any decrypted partition result is zero.
pub fn matching_slots(decrypted: &[Vec<u64>]) -> Vec<usize> {
    let nslots = decrypted.iter().map(Vec::len).min().unwrap_or(0);
    (0..nslots)
        .filter(|&slot| decrypted.iter().any(|partition| partition[slot] == 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        he::ClientContext,
        polynomial::{encode_bins, evaluate},
        simple_hash::SimpleHash,
        windowing::window_slots,
    };
    use fhe_traits::Serialize as _;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn encrypt_query(
        client: &ClientContext,
        slots: &[u64],
        params: &Parameters,
        rng: &mut StdRng,
    ) -> Vec<(Rung, Vec<u8>)> {
        window_slots(slots, params)
            .into_iter()
            .map(|(rung, column)| (rung, client.encrypt(&column, rng).unwrap().to_bytes()))
            .collect()
    }

    fn decrypt_all(client: &ClientContext, responses: &[Ciphertext]) -> Vec<Vec<u64>> {
        responses
            .iter()
            .map(|ct| {
                let ct = client.ciphertext_from_bytes(&ct.to_bytes()).unwrap();
                client.decrypt(&ct).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_matching_slots() {
        let decrypted = vec![vec![1, 0, 5, 7], vec![3, 4, 0, 7]];
        assert_eq!(matching_slots(&decrypted), vec![1, 2]);
        assert!(matching_slots(&[]).is_empty());
    }

    #[test]
    fn test_evaluate_finds_stored_values() {
        let params = Parameters::derive(1 << 12, 10, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let hashes = crate::hashing::HashFunctions::new(&params);
        let server_values: Vec<u64> = (1..=200u64).map(|i| i * 1_000_003).collect();
        let tbl = SimpleHash::build(&server_values, &params).unwrap();
        let coeffs = encode_bins(&tbl.padded(params.dummy_server()), &params);
        let db = Database::encode(&coeffs, &params).unwrap();
        assert_eq!(db.npartitions(), params.alpha);

        // one slot holds a value the server stored, another a value it never
        // saw, each at its own bin
        let present = server_values[17];
        let bin_present = hashes.location(present, 0);
        let absent = (999_999_937u64..)
            .find(|v| hashes.location(*v, 1) != bin_present)
            .unwrap();
        let bin_absent = hashes.location(absent, 1);
        let mut slots = vec![params.dummy_client(); params.number_of_bins()];
        slots[bin_present] = hashes.left_and_index(present, 0);
        slots[bin_absent] = hashes.left_and_index(absent, 1);

        let client = ClientContext::new(&params, &mut rng).unwrap();
        let public = client.public_context(&mut rng).unwrap();
        let server = ServerContext::new(&params, db.bfv(), &public).unwrap();
        let query = encrypt_query(&client, &slots, &params, &mut rng);
        let rungs = decode_query(&server, &query, &params).unwrap();
        let responses = db.evaluate(&server, &rungs, &params).unwrap();
        assert_eq!(matching_slots(&decrypt_all(&client, &responses)), vec![bin_present]);
    }

    // Depth-two power reconstruction followed by the coefficient dot product,
    // checked slot by slot against plain evaluation.
    #[test]
    fn test_evaluate_deepest_ladder() {
        let params = Parameters::derive(1 << 18, 100, 0).unwrap();
        assert_eq!((params.minibin_capacity(), params.alpha), (22, 8));
        let t = params.plain_modulus;
        let width = params.minibin_capacity() + 1;
        let mut rng = StdRng::seed_from_u64(3);
        let coeffs: Vec<Vec<u64>> = (0..params.number_of_bins())
            .map(|_| (0..params.alpha * width).map(|_| rng.gen_range(0..t)).collect())
            .collect();
        let slots: Vec<u64> = (0..params.number_of_bins())
            .map(|_| rng.gen_range(0..t))
            .collect();
        let db = Database::encode(&coeffs, &params).unwrap();

        let client = ClientContext::new(&params, &mut rng).unwrap();
        let public = client.public_context(&mut rng).unwrap();
        let server = ServerContext::new(&params, db.bfv(), &public).unwrap();
        let query = encrypt_query(&client, &slots, &params, &mut rng);
        let rungs = decode_query(&server, &query, &params).unwrap();
        let decrypted = decrypt_all(&client, &db.evaluate(&server, &rungs, &params).unwrap());

        assert_eq!(decrypted.len(), params.alpha);
        for (j, partition) in decrypted.iter().enumerate() {
            for (b, y) in slots.iter().enumerate() {
                let expected = evaluate(&coeffs[b][j * width..(j + 1) * width], *y, t);
                assert_eq!(partition[b], expected, "partition {} bin {}", j, b);
            }
        }
    }

    #[test]
    fn test_foreign_context_rejected() {
        let params = Parameters::derive(6, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let width = params.minibin_capacity() + 1;
        let coeffs = vec![vec![1u64; params.alpha * width]; params.number_of_bins()];
        let db = Database::encode(&coeffs, &params).unwrap();

        // same parameters, but a separately built BFV instance
        let client = ClientContext::new(&params, &mut rng).unwrap();
        let bfv = he::bfv_parameters(&params).unwrap();
        let server = ServerContext::new(&params, &bfv, &client.public_context(&mut rng).unwrap()).unwrap();
        let slots = vec![params.dummy_client(); params.number_of_bins()];
        let query = encrypt_query(&client, &slots, &params, &mut rng);
        let rungs = decode_query(&server, &query, &params).unwrap();
        assert!(matches!(
            db.evaluate(&server, &rungs, &params),
            Err(Error::PsiProtocolError(_))
        ));
    }

    #[test]
    fn test_malformed_query_rejected() {
        let params = Parameters::derive(6, 3, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let client = ClientContext::new(&params, &mut rng).unwrap();
        let bfv = he::bfv_parameters(&params).unwrap();
        let server = ServerContext::new(&params, &bfv, &client.public_context(&mut rng).unwrap()).unwrap();
        let ct = client
            .encrypt(&vec![1; params.number_of_bins()], &mut rng)
            .unwrap()
            .to_bytes();
        let short = vec![(Rung { digit: 0, window: 0 }, ct.clone())];
        assert!(matches!(
            decode_query(&server, &short, &params),
            Err(Error::PsiProtocolError(_))
        ));
        let garbage = vec![(Rung { digit: 0, window: 0 }, vec![1, 2, 3])];
        assert!(decode_query(&server, &garbage, &params).is_err());
    }
}
