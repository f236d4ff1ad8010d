// -*- mode: rust; -*-
//
// This file is part of ocelot.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Oblivious PRF instantiations.

pub mod ecdh;

pub use ecdh::{hash_to_point, point_to_prf, EncodedPoint, OprfKey, POINT_LEN};

/// Blinded Diffie-Hellman OPRF sender: the party holding the PRF key.
pub type EcdhSender = ecdh::Sender;
/// Blinded Diffie-Hellman OPRF receiver: the party learning PRF outputs.
pub type EcdhReceiver = ecdh::Receiver;
