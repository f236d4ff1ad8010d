// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use super::SyncChannel;
use std::{
    io::{BufReader, BufWriter},
    os::unix::net::UnixStream,
};

/// A SyncChannel which uses UnixStreams.
pub type UnixChannel = SyncChannel<BufReader<UnixStream>, BufWriter<UnixStream>>;

/// Convenience function to create a pair of UnixChannels for local tests in `swanky`.
pub fn unix_channel_pair() -> (UnixChannel, UnixChannel) {
    let (tx, rx) = UnixStream::pair().unwrap();
    let sender = SyncChannel::new(BufReader::new(tx.try_clone().unwrap()), BufWriter::new(tx));
    let receiver = SyncChannel::new(BufReader::new(rx.try_clone().unwrap()), BufWriter::new(rx));
    (sender, receiver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AbstractChannel, ChannelError};

    #[test]
    fn test_frames_across_threads() {
        let (mut tx, mut rx) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            for i in 0..4usize {
                tx.write_message(&vec![i as u64; i * 3000]).unwrap();
            }
        });
        for i in 0..4usize {
            let got: Vec<u64> = rx.read_message().unwrap();
            assert_eq!(got, vec![i as u64; i * 3000]);
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_peer_closes_mid_frame() {
        let (tx, mut rx) = unix_channel_pair();
        let handle = std::thread::spawn(move || {
            let writer = tx.writer();
            let mut writer = writer.lock().unwrap();
            // Announce 8192 bytes but only deliver 100 before hanging up.
            std::io::Write::write_all(&mut *writer, b"8192      ").unwrap();
            std::io::Write::write_all(&mut *writer, &[7u8; 100]).unwrap();
            std::io::Write::flush(&mut *writer).unwrap();
            writer.get_ref().shutdown(std::net::Shutdown::Both).unwrap();
        });
        handle.join().unwrap();
        match rx.read_frame() {
            Err(ChannelError::Truncated { expected, received }) => {
                assert_eq!(expected, 8192);
                assert_eq!(received, 100);
            }
            other => panic!("expected a truncation error, got {:?}", other),
        }
    }
}
