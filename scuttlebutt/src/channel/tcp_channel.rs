// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use super::{Result, SyncChannel, TrackChannel};
use std::{
    io::{BufReader, BufWriter},
    net::TcpStream,
};

/// A tracked, buffered channel over a single TCP connection.
pub type TcpChannel = TrackChannel<SyncChannel<BufReader<TcpStream>, BufWriter<TcpStream>>>;

/// Wrap a connected `stream` into a [`TcpChannel`].
///
/// Nagle's algorithm is disabled since the protocols built on top of this
/// channel are strictly request/response.
pub fn tcp_channel(stream: TcpStream) -> Result<TcpChannel> {
    stream.set_nodelay(true)?;
    let reader = BufReader::new(stream.try_clone()?);
    let writer = BufWriter::new(stream);
    Ok(TrackChannel::new(SyncChannel::new(reader, writer)))
}
