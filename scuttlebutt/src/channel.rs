// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

mod sync_channel;
mod tcp_channel;
mod track_channel;
#[cfg(unix)]
mod unix_channel;

pub use sync_channel::SyncChannel;
pub use tcp_channel::{tcp_channel, TcpChannel};
pub use track_channel::TrackChannel;

#[cfg(unix)]
pub use unix_channel::{unix_channel_pair, UnixChannel};

use serde::{de::DeserializeOwned, Serialize};
use std::{
    cell::RefCell,
    io::{ErrorKind, Read, Write},
    rc::Rc,
};

/// Length in bytes of the ASCII decimal header preceding every frame.
pub const HEADER_LEN: usize = 10;

/// Largest number of bytes requested from the underlying reader at once.
pub const CHUNK_SIZE: usize = 4096;

/// Largest payload whose length fits in the header.
pub const MAX_FRAME_LEN: usize = 9_999_999_999;

/// Errors produced by channels.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred on the underlying stream.
    IoError(std::io::Error),
    /// The peer closed the stream before the declared number of bytes arrived.
    Truncated {
        /// Number of bytes announced (or required, for headers).
        expected: usize,
        /// Number of bytes actually received.
        received: usize,
    },
    /// The frame header is not a left-justified decimal length.
    InvalidHeader(String),
    /// The payload is too large to be described by a 10-byte header.
    FrameTooLarge(usize),
    /// A frame payload could not be (de)serialized.
    SerializationError(bincode::Error),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::SerializationError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(e: std::io::Error) -> Error {
        Error::IoError(e)
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
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::Truncated { expected, received } => write!(
                f,
                "peer closed the connection after {} of {} bytes",
                received, expected
            ),
            Error::InvalidHeader(h) => write!(f, "invalid frame header {:?}", h),
            Error::FrameTooLarge(n) => write!(f, "frame of {} bytes does not fit the header", n),
            Error::SerializationError(e) => write!(f, "serialization error: {}", e),
        }
    }
}

/// Result type of channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Encode `len` as a 10-byte, left-justified, space-padded decimal header.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_LEN]> {
    if len > MAX_FRAME_LEN {
        return Err(Error::FrameTooLarge(len));
    }
    let mut header = [b' '; HEADER_LEN];
    let digits = len.to_string();
    header[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(header)
}

/// Decode a header produced by [`encode_header`].
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize> {
    let text = std::str::from_utf8(header)
        .map_err(|_| Error::InvalidHeader(String::from_utf8_lossy(header).into_owned()))?;
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidHeader(text.to_string()));
    }
    digits
        .parse::<usize>()
        .map_err(|_| Error::InvalidHeader(text.to_string()))
}

/// A trait for managing I/O. `AbstractChannel`s are clonable, and provide
/// framed read/write capabilities on top of a raw byte stream.
pub trait AbstractChannel {
    /// Read at most `bytes.len()` bytes from the channel, returning how many
    /// were read. `Ok(0)` means the peer closed the stream.
    fn read_some(&mut self, bytes: &mut [u8]) -> Result<usize>;
    /// Write a slice of `u8`s to the channel.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;
    /// Flush the channel.
    fn flush(&mut self) -> Result<()>;
    /// Clone the channel.
    fn clone(&self) -> Self
    where
        Self: Sized;

    /// Fill `bytes` completely, failing with [`Error::Truncated`] if the peer
    /// closes first.
    fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < bytes.len() {
            let n = self.read_some(&mut bytes[filled..])?;
            if n == 0 {
                return Err(Error::Truncated {
                    expected: bytes.len(),
                    received: filled,
                });
            }
            filled += n;
        }
        Ok(())
    }

    /// Write `payload` as a single frame and flush.
    fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let header = encode_header(payload.len())?;
        self.write_bytes(&header)?;
        self.write_bytes(payload)?;
        self.flush()
    }

    /// Read a single frame, accumulating at most [`CHUNK_SIZE`] bytes per read
    /// until the declared length has arrived.
    fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut header = [0u8; HEADER_LEN];
        self.read_bytes(&mut header)?;
        let len = decode_header(&header)?;
        let mut payload = Vec::with_capacity(len.min(1 << 24));
        let mut chunk = [0u8; CHUNK_SIZE];
        while payload.len() < len {
            let want = CHUNK_SIZE.min(len - payload.len());
            let n = self.read_some(&mut chunk[..want])?;
            if n == 0 {
                return Err(Error::Truncated {
                    expected: len,
                    received: payload.len(),
                });
            }
            payload.extend_from_slice(&chunk[..n]);
        }
        log::trace!("read frame of {} bytes", len);
        Ok(payload)
    }

    /// Serialize `message` with `bincode` and send it as one frame.
    fn write_message<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let bytes = bincode::serialize(message)?;
        self.write_frame(&bytes)
    }

    /// Read one frame and deserialize it with `bincode`.
    fn read_message<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read_frame()?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

/// Read from `reader`, retrying when interrupted by a signal.
pub(crate) fn read_retrying<R: Read>(reader: &mut R, bytes: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(bytes) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            r => return r.map_err(Error::from),
        }
    }
}

/// A standard read/write channel that implements `AbstractChannel`.
pub struct Channel<R, W> {
    reader: Rc<RefCell<R>>,
    writer: Rc<RefCell<W>>,
}

impl<R: Read, W: Write> Channel<R, W> {
    /// Make a new `Channel` from a `reader` and a `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        let reader = Rc::new(RefCell::new(reader));
        let writer = Rc::new(RefCell::new(writer));
        Self { reader, writer }
    }

    /// Return a reader object wrapped in `Rc<RefCell>`.
    pub fn reader(self) -> Rc<RefCell<R>> {
        self.reader
    }

    /// Return a writer object wrapped in `Rc<RefCell>`.
    pub fn writer(self) -> Rc<RefCell<W>> {
        self.writer
    }
}

impl<R: Read, W: Write> AbstractChannel for Channel<R, W> {
    #[inline(always)]
    fn read_some(&mut self, bytes: &mut [u8]) -> Result<usize> {
        read_retrying(&mut *self.reader.borrow_mut(), bytes)
    }

    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.borrow_mut().write_all(bytes)?;
        Ok(())
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<()> {
        self.writer.borrow_mut().flush()?;
        Ok(())
    }

    #[inline(always)]
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            writer: self.writer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// A reader handing out at most `step` bytes per call, to exercise
    /// short reads.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut channel = Channel::new(std::io::empty(), &mut out);
            channel.write_frame(payload).unwrap();
        }
        out
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(&encode_header(0).unwrap(), b"0         ");
        assert_eq!(&encode_header(4096).unwrap(), b"4096      ");
        assert_eq!(&encode_header(MAX_FRAME_LEN).unwrap(), b"9999999999");
        assert!(matches!(
            encode_header(MAX_FRAME_LEN + 1),
            Err(Error::FrameTooLarge(_))
        ));
    }

    #[test]
    fn test_invalid_header() {
        assert!(matches!(
            decode_header(b"          "),
            Err(Error::InvalidHeader(_))
        ));
        assert!(matches!(
            decode_header(b"12ab      "),
            Err(Error::InvalidHeader(_))
        ));
        assert_eq!(decode_header(b"17        ").unwrap(), 17);
    }

    #[test]
    fn test_frame_over_short_reads() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| i as u8).collect();
        let wire = framed(&payload);
        let reader = Trickle {
            data: wire,
            pos: 0,
            step: 7,
        };
        let mut channel = Channel::new(reader, std::io::sink());
        assert_eq!(channel.read_frame().unwrap(), payload);
    }

    #[test]
    fn test_truncated_payload() {
        let payload = vec![42u8; 9000];
        let mut wire = framed(&payload);
        wire.truncate(HEADER_LEN + 5000);
        let mut channel = Channel::new(Cursor::new(wire), std::io::sink());
        match channel.read_frame() {
            Err(Error::Truncated { expected, received }) => {
                assert_eq!(expected, 9000);
                assert_eq!(received, 5000);
            }
            other => panic!("expected a truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        let mut channel = Channel::new(Cursor::new(b"12".to_vec()), std::io::sink());
        assert!(matches!(
            channel.read_frame(),
            Err(Error::Truncated {
                expected: HEADER_LEN,
                received: 2
            })
        ));
    }

    #[test]
    fn test_messages_back_to_back() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Msg {
            tag: u32,
            body: Vec<Vec<u8>>,
        }
        let a = Msg {
            tag: 1,
            body: vec![vec![1, 2, 3], vec![]],
        };
        let b = Msg {
            tag: 2,
            body: vec![vec![9; 5000]],
        };
        let mut wire = Vec::new();
        {
            let mut channel = Channel::new(std::io::empty(), &mut wire);
            channel.write_message(&a).unwrap();
            channel.write_message(&b).unwrap();
        }
        let mut channel = Channel::new(Cursor::new(wire), std::io::sink());
        assert_eq!(channel.read_message::<Msg>().unwrap(), a);
        assert_eq!(channel.read_message::<Msg>().unwrap(), b);
    }

    proptest! {
        #[test]
        fn prop_header_decodes(len in 0usize..=MAX_FRAME_LEN) {
            let header = encode_header(len).unwrap();
            prop_assert_eq!(decode_header(&header).unwrap(), len);
        }
    }
}
