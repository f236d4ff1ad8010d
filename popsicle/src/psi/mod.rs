// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

pub mod unbalanced;

/// Unbalanced private set intersection server.
pub type Server = unbalanced::Server;
/// Unbalanced private set intersection client.
pub type Client = unbalanced::Client;
