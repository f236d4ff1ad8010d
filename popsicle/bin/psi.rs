// -*- mode: rust; -*-
//
// This file is part of `popsicle`.
// Copyright © 2019 Galois, Inc.
// See LICENSE for licensing information.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use eyre::{bail, Result, WrapErr};
use log::{info, warn};
use popsicle::{
    utils::{load_or_generate_key, read_artifact, read_set, write_artifact, write_set},
    windowing::depth,
    Client, ClientPreprocessed, Element, Parameters, Server, ServerPreprocessed,
};
use rand::{seq::SliceRandom, thread_rng, Rng};
use scuttlebutt::tcp_channel;
use std::{
    collections::BTreeSet,
    env,
    net::{TcpListener, TcpStream},
    path::Path,
    time::Instant,
};

fn generate(
    params: &Parameters,
    server_path: &Path,
    client_path: &Path,
    intersection_path: &Path,
) -> Result<()> {
    let mut rng = thread_rng();
    let total = params.server_size + params.client_size - params.intersection_size;
    let mut pool = BTreeSet::new();
    while pool.len() < total {
        pool.insert(rng.gen::<u64>() >> 1);
    }
    let mut pool: Vec<u64> = pool.into_iter().collect();
    pool.shuffle(&mut rng);
    let (server, rest) = pool.split_at(params.server_size);
    let shared = &server[..params.intersection_size];

    let to_set = |xs: &[u64]| xs.iter().map(|x| Element::from(*x)).collect::<BTreeSet<_>>();
    let client = to_set(rest).union(&to_set(shared)).cloned().collect::<BTreeSet<_>>();
    write_set(server_path, &to_set(server)).wrap_err("writing the server set")?;
    write_set(client_path, &client).wrap_err("writing the client set")?;
    write_set(intersection_path, &to_set(shared)).wrap_err("writing the intersection")?;
    info!(
        "wrote {} server, {} client and {} shared elements",
        server.len(),
        client.len(),
        shared.len()
    );
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let sizes = cli.sizes;
    let params = Parameters::derive(sizes.server_size, sizes.client_size, sizes.intersection_size)
        .wrap_err("deriving parameters")?;
    let mut rng = thread_rng();

    match &cli.command {
        Command::Params => {
            println!("{}", params);
            println!(
                "multiplicative depth: {}",
                (1..=params.minibin_capacity())
                    .map(|e| depth(e, params.base()))
                    .max()
                    .unwrap_or(0)
            );
        }
        Command::Generate {
            server_set,
            client_set,
            intersection,
        } => generate(&params, server_set, client_set, intersection)?,
        Command::ServerOffline {
            server_set,
            key,
            output,
        } => {
            let start = Instant::now();
            let key = load_or_generate_key(key, &mut rng).wrap_err("loading the server key")?;
            let set = read_set(server_set).wrap_err("reading the server set")?;
            let set: Vec<Element> = set.into_iter().collect();
            let server = Server::new(params, key);
            let preprocessed = server
                .preprocess(&set)
                .wrap_err("server offline phase")?;
            write_artifact(output, &preprocessed).wrap_err("writing server preprocessing")?;
            info!("server offline phase done in {:?}", start.elapsed());
        }
        Command::ClientOffline {
            client_set,
            key,
            output,
        } => {
            let start = Instant::now();
            let key = load_or_generate_key(key, &mut rng).wrap_err("loading the client key")?;
            let set = read_set(client_set).wrap_err("reading the client set")?;
            let set: Vec<Element> = set.into_iter().collect();
            let client = Client::new(params, key);
            let preprocessed = client
                .preprocess(&set)
                .wrap_err("client offline phase")?;
            write_artifact(output, &preprocessed).wrap_err("writing client preprocessing")?;
            info!("client offline phase done in {:?}", start.elapsed());
        }
        Command::ServerOnline { key, preprocessed } => {
            let key = load_or_generate_key(key, &mut rng).wrap_err("loading the server key")?;
            let preprocessed: ServerPreprocessed =
                read_artifact(preprocessed).wrap_err("reading server preprocessing")?;
            let server = Server::new(params, key);
            let database = server
                .load(&preprocessed)
                .wrap_err("loading server preprocessing")?;

            let listener = TcpListener::bind(&cli.connection_addr)?;
            info!("server listening on {}", cli.connection_addr);
            let (stream, peer) = listener.accept()?;
            info!("connection from {}", peer);
            let start = Instant::now();
            let mut channel = tcp_channel(stream)?;
            server
                .send(&database, &mut channel)
                .wrap_err("server online phase")?;
            info!("server online phase done in {:?}", start.elapsed());
            info!(
                "communication: sent {:.2} KB, received {:.2} KB",
                channel.kilobytes_written(),
                channel.kilobytes_read()
            );
        }
        Command::ClientOnline {
            key,
            preprocessed,
            output,
            expected,
        } => {
            let key = load_or_generate_key(key, &mut rng).wrap_err("loading the client key")?;
            let preprocessed: ClientPreprocessed =
                read_artifact(preprocessed).wrap_err("reading client preprocessing")?;
            let client = Client::new(params, key);

            let stream = TcpStream::connect(&cli.connection_addr)
                .wrap_err_with(|| format!("connecting to {}", cli.connection_addr))?;
            let start = Instant::now();
            let mut channel = tcp_channel(stream)?;
            let intersection = client
                .receive(&preprocessed, &mut channel, &mut rng)
                .wrap_err("client online phase")?;
            info!("client online phase done in {:?}", start.elapsed());
            info!(
                "communication: sent {:.2} KB, received {:.2} KB",
                channel.kilobytes_written(),
                channel.kilobytes_read()
            );
            write_set(output, &intersection).wrap_err("writing the intersection")?;
            info!("intersection of {} elements written", intersection.len());

            if let Some(expected) = expected {
                let expected = read_set(expected).wrap_err("reading the expected intersection")?;
                let found: BTreeSet<Element> = intersection.into_iter().collect();
                if found == expected {
                    info!("intersection matches {}", expected.len());
                } else {
                    warn!(
                        "intersection differs: {} missing, {} unexpected",
                        expected.difference(&found).count(),
                        found.difference(&expected).count()
                    );
                    bail!("computed intersection differs from the expected one");
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // if log-level `RUST_LOG` not already set, then set to info
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init_timed();

    let cli = Cli::parse();
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .wrap_err("configuring the thread pool")?;
    }
    run(&cli)
}
