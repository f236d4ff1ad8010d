/*!
Cli utilities.

*/
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_ADDR: &str = "127.0.0.1:4471";

/// The public sizes both parties derive their parameters from.
#[derive(Args, Clone, Copy, Debug)]
pub(crate) struct Sizes {
    /// Upper bound on the server set size
    #[arg(long, default_value_t = 1 << 20, global = true)]
    pub server_size: usize,

    /// Upper bound on the client set size
    #[arg(long, default_value_t = 5535, global = true)]
    pub client_size: usize,

    /// Expected intersection size
    #[arg(long, default_value_t = 10, global = true)]
    pub intersection_size: usize,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print the parameters derived from the set sizes
    Params,

    /// Write random server and client sets with a known intersection
    Generate {
        /// server set path
        #[arg(long, default_value = "server_set")]
        server_set: PathBuf,
        /// client set path
        #[arg(long, default_value = "client_set")]
        client_set: PathBuf,
        /// expected intersection path
        #[arg(long, default_value = "intersection")]
        intersection: PathBuf,
    },

    /// Apply the OPRF to the server set and encode it as polynomials
    ServerOffline {
        /// server set path
        #[arg(long, default_value = "server_set")]
        server_set: PathBuf,
        /// server OPRF key path, created if missing
        #[arg(long, default_value = "server.key")]
        key: PathBuf,
        /// output path
        #[arg(long, default_value = "server_preprocessed")]
        output: PathBuf,
    },

    /// Blind the client set
    ClientOffline {
        /// client set path
        #[arg(long, default_value = "client_set")]
        client_set: PathBuf,
        /// client blinding key path, created if missing
        #[arg(long, default_value = "client.key")]
        key: PathBuf,
        /// output path
        #[arg(long, default_value = "client_preprocessed")]
        output: PathBuf,
    },

    /// Serve one client
    ServerOnline {
        /// server OPRF key path
        #[arg(long, default_value = "server.key")]
        key: PathBuf,
        /// preprocessed server data
        #[arg(long, default_value = "server_preprocessed")]
        preprocessed: PathBuf,
    },

    /// Query the server and write the intersection
    ClientOnline {
        /// client blinding key path
        #[arg(long, default_value = "client.key")]
        key: PathBuf,
        /// preprocessed client data
        #[arg(long, default_value = "client_preprocessed")]
        preprocessed: PathBuf,
        /// output path
        #[arg(long, default_value = "client_intersection_result.txt")]
        output: PathBuf,
        /// expected intersection to compare against
        #[arg(long)]
        expected: Option<PathBuf>,
    },
}

/// Cli.
#[derive(Parser)]
#[clap(name = "psi")]
#[clap(author = "swanky authors <swanky@galois.com>")]
#[clap(version = "0.1")]
#[clap(about = "Unbalanced private set intersection")]
pub(crate) struct Cli {
    #[command(flatten)]
    pub sizes: Sizes,

    /// Set addr for tcp connection
    #[clap(default_value_t = DEFAULT_ADDR.to_string(), short, long, global = true)]
    pub connection_addr: String,

    /// Number of rayon worker threads
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[clap(subcommand)]
    pub command: Command,
}
