// -*- mode: rust; -*-
//
// This file is part of `scuttlebutt`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

use super::{read_retrying, AbstractChannel, Error, Result};
use std::{
    io::{Read, Write},
    sync::{Arc, Mutex, MutexGuard},
};

/// A channel that implements `AbstractChannel` as well as `Send` and `Sync`.
pub struct SyncChannel<R, W> {
    reader: Arc<Mutex<R>>,
    writer: Arc<Mutex<W>>,
}

impl<R: Read, W: Write> SyncChannel<R, W> {
    /// Make a new `SyncChannel` from a `reader` and a `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        let reader = Arc::new(Mutex::new(reader));
        let writer = Arc::new(Mutex::new(writer));
        Self { reader, writer }
    }

    /// Return a reader object wrapped in `Arc<Mutex<R>>`.
    pub fn reader(self) -> Arc<Mutex<R>> {
        self.reader
    }

    /// Return a writer object wrapped in `Arc<Mutex<W>>`.
    pub fn writer(self) -> Arc<Mutex<W>> {
        self.writer
    }
}

fn poisoned<T>(_: std::sync::PoisonError<MutexGuard<'_, T>>) -> Error {
    Error::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        "channel lock poisoned",
    ))
}

impl<R: Read, W: Write> AbstractChannel for SyncChannel<R, W> {
    #[inline(always)]
    fn read_some(&mut self, bytes: &mut [u8]) -> Result<usize> {
        let mut reader = self.reader.lock().map_err(poisoned)?;
        read_retrying(&mut *reader, bytes)
    }

    #[inline(always)]
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.lock().map_err(poisoned)?.write_all(bytes)?;
        Ok(())
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<()> {
        self.writer.lock().map_err(poisoned)?.flush()?;
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
