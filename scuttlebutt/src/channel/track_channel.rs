// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use super::{AbstractChannel, Result};

/// A channel for tracking the number of bits read/written.
pub struct TrackChannel<C> {
    channel: C,
    nbits_read: usize,
    nbits_written: usize,
}

impl<C: AbstractChannel> TrackChannel<C> {
    /// Make a new `TrackChannel` on top of `channel`.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            nbits_read: 0,
            nbits_written: 0,
        }
    }

    /// Return the number of kilobits written to the channel.
    pub fn kilobits_written(&self) -> f64 {
        self.nbits_written as f64 / 1000.0
    }

    /// Return the number of kilobits read from the channel.
    pub fn kilobits_read(&self) -> f64 {
        self.nbits_read as f64 / 1000.0
    }

    /// Return the total amount of communication on the channel.
    pub fn total_kilobits(&self) -> f64 {
        self.kilobits_written() + self.kilobits_read()
    }

    /// Return the number of kilobytes written to the channel.
    pub fn kilobytes_written(&self) -> f64 {
        self.nbits_written as f64 / 8192.0
    }

    /// Return the number of kilobytes read from the channel.
    pub fn kilobytes_read(&self) -> f64 {
        self.nbits_read as f64 / 8192.0
    }
}

impl<C: AbstractChannel> AbstractChannel for TrackChannel<C> {
    #[inline]
    fn read_some(&mut self, bytes: &mut [u8]) -> Result<usize> {
        let n = self.channel.read_some(bytes)?;
        self.nbits_read += n * 8;
        Ok(n)
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.nbits_written += bytes.len() * 8;
        self.channel.write_bytes(bytes)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        self.channel.flush()
    }

    #[inline]
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            nbits_written: self.nbits_written,
            nbits_read: self.nbits_read,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Channel;
    use std::io::Cursor;

    #[test]
    fn test_counts_header_and_payload() {
        let mut wire = Vec::new();
        {
            let mut channel = TrackChannel::new(Channel::new(std::io::empty(), &mut wire));
            channel.write_frame(&[0u8; 90]).unwrap();
            assert_eq!(channel.kilobits_written(), 0.8);
        }
        let mut channel = TrackChannel::new(Channel::new(Cursor::new(wire), std::io::sink()));
        let payload = channel.read_frame().unwrap();
        assert_eq!(payload.len(), 90);
        assert_eq!(channel.kilobits_read(), 0.8);
        assert_eq!(channel.total_kilobits(), 0.8);
    }
}
