// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Unbalanced private set intersection from an elliptic-curve OPRF and leveled
//! BFV (cf. <https://eprint.iacr.org/2021/1116>, after
//! <https://eprint.iacr.org/2017/299>).
//!
//! Offline, the server applies its OPRF key to its set, simple-hashes the PRF
//! values and turns every bin partition into the coefficients of a
//! polynomial vanishing on it. Offline, the client blinds its set. Online,
//! the client learns its PRF values through one OPRF round, cuckoo-hashes
//! them, and sends the encrypted windowed powers of its slots. The server
//! evaluates its polynomials homomorphically and returns one ciphertext per
//! partition; a zero slot marks an element of the intersection.

use crate::{
    cuckoo::CuckooHash,
    he::{ClientContext, PublicContext, ServerContext},
    matching::{decode_query, matching_slots, Database},
    params::Parameters,
    polynomial::encode_bins,
    simple_hash::SimpleHash,
    utils::element_bytes,
    windowing::{window_slots, Rung},
    Element, Error,
};
use fhe_traits::Serialize as _;
use itertools::Itertools;
use ocelot::oprf::{EcdhReceiver, EcdhSender, EncodedPoint, OprfKey};
use rand::{CryptoRng, Rng};
use scuttlebutt::{AbstractChannel, SemiHonest};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    time::Instant,
};

/// The server's offline output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerPreprocessed {
    /// Fingerprint of the parameters used.
    pub fingerprint: [u8; 32],
    /// Per bin, the concatenated partition polynomials, lowest degree first.
    pub coefficients: Vec<Vec<u64>>,
}

/// The client's offline output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientPreprocessed {
    /// Fingerprint of the parameters used.
    pub fingerprint: [u8; 32],
    /// Public image of the blinding key.
    pub key_image: EncodedPoint,
    /// The distinct client elements, in the order they were blinded.
    pub elements: Vec<Element>,
    /// The blinded elements.
    pub blinded: Vec<EncodedPoint>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Handshake {
    Accept,
    Reject { fingerprint: [u8; 32] },
}

#[derive(Serialize, Deserialize)]
struct Query {
    context: PublicContext,
    rungs: Vec<(Rung, Vec<u8>)>,
}

fn distinct<'a>(set: &'a [Element], declared: usize) -> Result<Vec<&'a Element>, Error> {
    let unique = set.iter().collect::<BTreeSet<_>>();
    if unique.len() > declared {
        return Err(Error::InvalidSetSize {
            declared,
            actual: unique.len(),
        });
    }
    Ok(unique.into_iter().collect())
}

/// Unbalanced PSI server.
pub struct Server {
    params: Parameters,
    oprf: EcdhSender,
}

impl Server {
    /// Create a server holding OPRF key `key`.
    pub fn new(params: Parameters, key: OprfKey) -> Self {
        let oprf = EcdhSender::new(key, params.sigma_max);
        Self { params, oprf }
    }

    /// The parameters in use.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Offline phase: PRF, simple-hash and polynomially encode `set`.
    pub fn preprocess(&self, set: &[Element]) -> Result<ServerPreprocessed, Error> {
        let params = &self.params;
        let inputs = distinct(set, params.server_size)?
            .into_iter()
            .map(element_bytes)
            .collect_vec();

        let start = Instant::now();
        let prfs = self
            .oprf
            .offline_evaluate(&inputs)
            .into_iter()
            .unique()
            .collect_vec();
        log::info!(
            "Server :: applied the OPRF to {} elements in {:?}",
            inputs.len(),
            start.elapsed()
        );

        let start = Instant::now();
        let table = SimpleHash::build(&prfs, params)?;
        log::info!(
            "Server :: simple hashing done in {:?}, fullest bin holds {} of {}",
            start.elapsed(),
            table.max_occupancy(),
            params.bin_capacity
        );

        let start = Instant::now();
        let coefficients = encode_bins(&table.padded(params.dummy_server()), params);
        log::info!(
            "Server :: computed {} x {} polynomials in {:?}",
            coefficients.len(),
            params.alpha,
            start.elapsed()
        );
        Ok(ServerPreprocessed {
            fingerprint: params.fingerprint(),
            coefficients,
        })
    }

    /// Batch-encode preprocessed polynomials, ready to answer queries.
    pub fn load(&self, preprocessed: &ServerPreprocessed) -> Result<Database, Error> {
        if preprocessed.fingerprint != self.params.fingerprint() {
            return Err(Error::ParameterMismatch);
        }
        Database::encode(&preprocessed.coefficients, &self.params)
    }

    /// Online phase: answer one client over `channel`.
    pub fn send<C: AbstractChannel>(&self, database: &Database, channel: &mut C) -> Result<(), Error> {
        let params = &self.params;
        let fingerprint = params.fingerprint();
        let theirs: [u8; 32] = channel.read_message()?;
        if theirs != fingerprint {
            channel.write_message(&Handshake::Reject { fingerprint })?;
            return Err(Error::ParameterMismatch);
        }
        channel.write_message(&Handshake::Accept)?;

        let start = Instant::now();
        let n = self.oprf.send(channel)?;
        log::info!("Server :: answered {} OPRF queries in {:?}", n, start.elapsed());
        if n > params.client_size {
            return Err(Error::PsiProtocolError(format!(
                "client sent {} elements, more than the agreed {}",
                n, params.client_size
            )));
        }

        let query: Query = channel.read_message()?;
        let start = Instant::now();
        let context = ServerContext::new(params, database.bfv(), &query.context)?;
        let rungs = decode_query(&context, &query.rungs, params)?;
        let responses = database.evaluate(&context, &rungs, params)?;
        log::info!(
            "Server :: evaluated {} partitions in {:?}",
            responses.len(),
            start.elapsed()
        );
        let responses = responses.iter().map(|ct| ct.to_bytes()).collect_vec();
        channel.write_message(&responses)?;
        Ok(())
    }
}

/// Unbalanced PSI client.
pub struct Client {
    params: Parameters,
    oprf: EcdhReceiver,
}

impl Client {
    /// Create a client blinding with `key`.
    pub fn new(params: Parameters, key: OprfKey) -> Self {
        let oprf = EcdhReceiver::new(key, params.sigma_max);
        Self { params, oprf }
    }

    /// The parameters in use.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Offline phase: blind the distinct elements of `set`.
    pub fn preprocess(&self, set: &[Element]) -> Result<ClientPreprocessed, Error> {
        let elements = distinct(set, self.params.client_size)?
            .into_iter()
            .cloned()
            .collect_vec();
        let inputs = elements.iter().map(element_bytes).collect_vec();
        let blinded = self.oprf.blind(&inputs);
        log::info!("Client :: blinded {} elements", blinded.len());
        Ok(ClientPreprocessed {
            fingerprint: self.params.fingerprint(),
            key_image: self.oprf.key_image(),
            elements,
            blinded,
        })
    }

    /// Online phase: run the protocol over `channel` and return the sorted
    /// intersection.
    pub fn receive<C: AbstractChannel, RNG: CryptoRng + Rng>(
        &self,
        preprocessed: &ClientPreprocessed,
        channel: &mut C,
        rng: &mut RNG,
    ) -> Result<Vec<Element>, Error> {
        let params = &self.params;
        let fingerprint = params.fingerprint();
        if preprocessed.fingerprint != fingerprint {
            return Err(Error::ParameterMismatch);
        }
        if preprocessed.key_image != self.oprf.key_image() {
            return Err(Error::KeyMismatch);
        }
        if preprocessed.elements.len() != preprocessed.blinded.len() {
            return Err(Error::PsiProtocolError(
                "preprocessed elements and blinded points disagree in length".to_string(),
            ));
        }

        channel.write_message(&fingerprint)?;
        match channel.read_message::<Handshake>()? {
            Handshake::Accept => {}
            Handshake::Reject { fingerprint } => {
                log::warn!("Client :: server rejected us, its fingerprint is {:02x?}", fingerprint);
                return Err(Error::ParameterMismatch);
            }
        }

        let start = Instant::now();
        let prfs = self.oprf.receive(channel, &preprocessed.blinded)?;
        log::info!("Client :: OPRF round done in {:?}", start.elapsed());

        let mut owner = HashMap::with_capacity(prfs.len());
        for (i, prf) in prfs.iter().enumerate() {
            owner.entry(*prf).or_insert(i);
        }

        let start = Instant::now();
        let table = CuckooHash::new(&prfs, params, rng)?;
        log::info!(
            "Client :: cuckoo hashed {} values in {:?}",
            table.len(),
            start.elapsed()
        );

        let start = Instant::now();
        let keys = ClientContext::new(params, rng)?;
        let context = keys.public_context(rng)?;
        let rungs = window_slots(&table.slots(), params)
            .into_iter()
            .map(|(rung, column)| Ok((rung, keys.encrypt(&column, rng)?.to_bytes())))
            .collect::<Result<Vec<_>, Error>>()?;
        log::info!(
            "Client :: encrypted {} windowed powers in {:?}",
            rungs.len(),
            start.elapsed()
        );
        channel.write_message(&Query { context, rungs })?;

        let responses: Vec<Vec<u8>> = channel.read_message()?;
        if responses.len() != params.alpha {
            return Err(Error::PsiProtocolError(format!(
                "expected {} response ciphertexts, got {}",
                params.alpha,
                responses.len()
            )));
        }
        let start = Instant::now();
        let decrypted = responses
            .iter()
            .map(|bytes| keys.decrypt(&keys.ciphertext_from_bytes(bytes)?))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut intersection = BTreeSet::new();
        for slot in matching_slots(&decrypted) {
            match table.reconstruct(slot).and_then(|prf| owner.get(&prf)) {
                Some(&i) => {
                    intersection.insert(preprocessed.elements[i].clone());
                }
                None => log::warn!("Client :: slot {} matched but holds no element", slot),
            }
        }
        log::info!(
            "Client :: decrypted and matched in {:?}, intersection has {} elements",
            start.elapsed(),
            intersection.len()
        );
        Ok(intersection.into_iter().collect())
    }
}

impl SemiHonest for Server {}
impl SemiHonest for Client {}
