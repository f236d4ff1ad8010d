// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

//! Reading and writing sets, keys and preprocessed artifacts.

use crate::{Element, Error};
use ocelot::oprf::OprfKey;
use rand::{CryptoRng, Rng};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

/// The bytes an element is hashed as.
pub fn element_bytes(element: &Element) -> Vec<u8> {
    element.to_bytes_be()
}

/// Read a newline-delimited set of non-negative decimal integers. Blank lines
/// are skipped and repeated elements collapse.
pub fn read_set<P: AsRef<Path>>(path: P) -> Result<BTreeSet<Element>, Error> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut set = BTreeSet::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let element = text.parse::<Element>().map_err(|_| {
            Error::ParseError(format!("{}:{}: {:?}", path.display(), i + 1, text))
        })?;
        set.insert(element);
    }
    Ok(set)
}

/// Atomically write `elements`, one per line, in iteration order.
pub fn write_set<'a, P, I>(path: P, elements: I) -> Result<(), Error>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Element>,
{
    write_atomically(path, |w| {
        for element in elements {
            writeln!(w, "{}", element)?;
        }
        Ok(())
    })
}

/// Atomically write a bincode-encoded artifact.
pub fn write_artifact<P: AsRef<Path>, T: Serialize>(path: P, artifact: &T) -> Result<(), Error> {
    write_atomically(path, |w| Ok(bincode::serialize_into(w, artifact)?))
}

/// Read a bincode-encoded artifact.
pub fn read_artifact<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, Error> {
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Load the OPRF key stored at `path`, generating and storing a fresh one if
/// the file does not exist.
pub fn load_or_generate_key<P: AsRef<Path>, RNG: CryptoRng + Rng>(
    path: P,
    rng: &mut RNG,
) -> Result<OprfKey, Error> {
    let path = path.as_ref();
    if path.exists() {
        let mut bytes = [0u8; 32];
        let mut file = File::open(path)?;
        file.read_exact(&mut bytes)?;
        if file.read(&mut [0u8; 1])? != 0 {
            return Err(Error::ParseError(format!(
                "{}: key file is longer than 32 bytes",
                path.display()
            )));
        }
        Ok(OprfKey::from_bytes(bytes)?)
    } else {
        let key = OprfKey::random(rng);
        write_atomically(path, |w| Ok(w.write_all(&key.to_bytes())?))?;
        log::info!("generated a new OPRF key in {}", path.display());
        Ok(key)
    }
}

// Write through a temporary file in the destination directory, renamed into
// place only once `f` succeeded.
fn write_atomically<P, F>(path: P, f: F) -> Result<(), Error>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<&mut File>) -> Result<(), Error>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        f(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
