// -*- mode: rust; -*-
//
// This file is part of ocelot.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

#![allow(clippy::many_single_char_names)]
#![deny(missing_docs)]

//! Oblivious pseudorandom functions for unbalanced private set intersection.
//!
//! The [`oprf`] module implements a blinded Diffie-Hellman OPRF over the
//! Ristretto prime-order group: `F(k, x) = H'(k · H(x))`, where `H` hashes to
//! the group and `H'` maps a group element to a short integer.

mod errors;
pub mod oprf;

pub use crate::errors::Error;
