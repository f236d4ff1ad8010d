// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

#![allow(clippy::many_single_char_names)]
#![deny(missing_docs)]

//! Communication channels for the `swanky` private set intersection crates.
//!
//! Every message exchanged between two parties travels as a single *frame*: a
//! 10-byte ASCII decimal length header (left-justified, space-padded) followed
//! by exactly that many payload bytes. Structured messages are encoded with
//! `bincode` before framing.

/// Module for encapsulating communication channels for `swanky`.
pub mod channel;

pub use crate::channel::{
    tcp_channel, AbstractChannel, Channel, Error as ChannelError, SyncChannel, TcpChannel,
    TrackChannel,
};

#[cfg(unix)]
pub use crate::channel::{unix_channel_pair, UnixChannel};

/// A marker trait denoting that the given scheme is semi-honest secure.
pub trait SemiHonest {}
