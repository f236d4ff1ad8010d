// -*- mode: rust; -*-
//
// This file is part of ocelot.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

/// Errors produced by `ocelot`.
#[derive(Debug)]
pub enum Error {
    /// The number of points received does not match the number sent.
    InvalidInputLength {
        /// Number of points expected.
        expected: usize,
        /// Number of points received.
        received: usize,
    },
    /// The point at the given position is not a valid Ristretto encoding.
    InvalidPoint(usize),
    /// The key bytes are not a canonical, invertible scalar.
    InvalidKey,
    /// The channel failed.
    ChannelError(scuttlebutt::ChannelError),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ChannelError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<scuttlebutt::ChannelError> for Error {
    fn from(e: scuttlebutt::ChannelError) -> Error {
        Error::ChannelError(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidInputLength { expected, received } => write!(
                f,
                "invalid input length: expected {} points, received {}",
                expected, received
            ),
            Error::InvalidPoint(i) => write!(f, "point #{} is not a valid group element", i),
            Error::InvalidKey => write!(f, "key is not a canonical invertible scalar"),
            Error::ChannelError(e) => write!(f, "channel error: {}", e),
        }
    }
}
