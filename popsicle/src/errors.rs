// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use scuttlebutt::ChannelError;

/// Errors produced by the private set intersection protocols.
#[derive(Debug)]
pub enum Error {
    /// The underlying oblivious PRF failed.
    OprfError(ocelot::Error),
    /// The framed channel failed.
    ChannelError(ChannelError),
    /// The homomorphic encryption library failed.
    FheError(fhe::Error),
    /// An input/output error occurred.
    IoError(std::io::Error),
    /// A persisted artifact could not be (de)serialized.
    SerializationError(bincode::Error),
    /// No parameter set exists for the requested sizes, or a derived
    /// parameter set violates one of its invariants.
    InvalidParameters(String),
    /// The peer (or a persisted artifact) was produced under a different
    /// parameter set.
    ParameterMismatch,
    /// Preprocessed blinded elements were produced under a different OPRF
    /// key than the one in use.
    KeyMismatch,
    /// A party's set holds more distinct elements than the agreed size.
    InvalidSetSize {
        /// The agreed upper bound.
        declared: usize,
        /// The number of distinct elements found.
        actual: usize,
    },
    /// A set file contains a line that is not a non-negative integer.
    ParseError(String),
    /// The cuckoo hash is full.
    CuckooHashFull {
        /// Number of evictions attempted before giving up.
        relocations: usize,
    },
    /// A server bin received more values than it can hold.
    BinOverflow {
        /// Index of the offending bin.
        bin: usize,
        /// The bin capacity.
        capacity: usize,
    },
    /// An error occurred in the PSI protocol.
    PsiProtocolError(String),
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(e: std::io::Error) -> Error {
        Error::IoError(e)
    }
}

impl From<ocelot::Error> for Error {
    #[inline]
    fn from(e: ocelot::Error) -> Error {
        Error::OprfError(e)
    }
}

impl From<ChannelError> for Error {
    #[inline]
    fn from(e: ChannelError) -> Error {
        Error::ChannelError(e)
    }
}

impl From<fhe::Error> for Error {
    #[inline]
    fn from(e: fhe::Error) -> Error {
        Error::FheError(e)
    }
}

impl From<bincode::Error> for Error {
    #[inline]
    fn from(e: bincode::Error) -> Error {
        Error::SerializationError(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::OprfError(e) => write!(f, "oblivious PRF error: {}", e),
            Error::ChannelError(e) => write!(f, "channel error: {}", e),
            Error::FheError(e) => write!(f, "homomorphic encryption error: {}", e),
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::SerializationError(e) => write!(f, "serialization error: {}", e),
            Error::InvalidParameters(s) => write!(f, "invalid parameters: {}", s),
            Error::ParameterMismatch => {
                write!(f, "parameter mismatch: peer uses a different parameter set")
            }
            Error::KeyMismatch => {
                write!(f, "key mismatch: preprocessed data was blinded under another key")
            }
            Error::InvalidSetSize { declared, actual } => write!(
                f,
                "set holds {} distinct elements but at most {} were agreed",
                actual, declared
            ),
            Error::ParseError(s) => write!(f, "parse error: {}", s),
            Error::CuckooHashFull { relocations } => write!(
                f,
                "cuckoo hash error: table is full after {} relocations",
                relocations
            ),
            Error::BinOverflow { bin, capacity } => write!(
                f,
                "simple hash error: bin {} exceeds its capacity of {}",
                bin, capacity
            ),
            Error::PsiProtocolError(s) => write!(f, "PSI protocol error: {}", s),
        }
    }
}

impl std::error::Error for Error {}
