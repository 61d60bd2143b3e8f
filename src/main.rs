use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use p2p_share::node::{self, Node, NodeConfig};
use p2p_share::{Verification, CHUNK_SIZE};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory that ingested files are chunked into
    #[clap(short, long)]
    store: Option<PathBuf>,

    /// Maximum chunk size in bytes
    #[clap(short, long, default_value_t = CHUNK_SIZE)]
    chunk_size: usize,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a file into chunks plus a metadata file
    Chunk { input: PathBuf, output_dir: PathBuf },
    /// Chunk a file into a fresh directory under the store
    Ingest { input: PathBuf },
    /// Verify chunks and rebuild the original file
    Assemble { metadata: PathBuf, output: PathBuf },
    /// Verify chunks without writing any output
    Verify { metadata: PathBuf },
    /// Chunk and reassemble a built-in sample
    Selftest,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse();

    let config = NodeConfig {
        store_root: args.store.unwrap_or_else(node::default_store_root),
        chunk_size: args.chunk_size,
    };
    let node = Node::new(config)?;

    match args.command {
        Command::Chunk { input, output_dir } => {
            let result = node.chunker().create_chunks(&input, &output_dir).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Ingest { input } => {
            let report = node.ingest_file(&input).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Assemble { metadata, output } => {
            let report = node.assemble(&metadata, &output).await?;
            match report.outcome.failure() {
                None => println!(
                    "File assembled successfully: {} ({} bytes)",
                    output.display(),
                    report.output_size.unwrap_or_default()
                ),
                Some(failure) => {
                    println!("Assembly failed: {}", failure);
                    std::process::exit(1);
                }
            }
        }
        Command::Verify { metadata } => match node.verify(&metadata).await? {
            Verification::Verified(meta) => println!(
                "All {} chunks of '{}' verified ({} bytes)",
                meta.chunk_count(),
                meta.file_name,
                meta.total_size
            ),
            Verification::Rejected(failure) => {
                println!("Verification failed: {}", failure);
                std::process::exit(1);
            }
        },
        Command::Selftest => {
            let report = node.self_test().await?;
            println!(
                "Chunked {} bytes into {} chunks at {}",
                report.test_file_size,
                report.result.total_chunks(),
                report.result.chunk_directory.display()
            );
            if report.round_trip_matches {
                println!("Self-test passed");
            } else {
                println!("Self-test failed: {:?}", report.assembly.outcome);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
