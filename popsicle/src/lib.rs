// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.
#![deny(missing_docs)]

//! Unbalanced private set intersection.
//!
//! A server holding a large set and a client holding a small one learn, on
//! the client side only, which client elements the server also holds. The
//! server's set is hidden behind an elliptic-curve OPRF and the client's
//! behind BFV encryption; the client's download is independent of the
//! server's set size up to the choice of parameters.
//!
//! Both parties first derive the same [`Parameters`] from the public set
//! sizes. [`Server::preprocess`] and [`Client::preprocess`] do the
//! data-dependent work ahead of time; [`Server::send`] and
//! [`Client::receive`] run the online protocol over any
//! [`scuttlebutt::AbstractChannel`].

mod cuckoo;
mod errors;
pub mod hashing;
pub mod he;
pub mod matching;
pub mod params;
pub mod polynomial;
mod psi;
pub mod simple_hash;
pub mod utils;
pub mod windowing;

pub use crate::{
    cuckoo::CuckooHash,
    errors::Error,
    params::Parameters,
    psi::{unbalanced::ClientPreprocessed, unbalanced::ServerPreprocessed, *},
};

/// A set element: an arbitrary-precision non-negative integer.
pub type Element = num_bigint::BigUint;
