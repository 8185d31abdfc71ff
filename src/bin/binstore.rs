//! Binary Store CLI
//!
//! Operator commands over a content-addressed S3 binary store

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use s3_binstore::{BinaryManager, BlobStore, Fingerprint, GarbageCollector, StoreConfig};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "binstore")]
#[command(about = "Content-addressed binary store on S3")]
struct Args {
    /// Store configuration (TOML)
    #[arg(short = 'c', long, default_value = "binstore.toml")]
    config: PathBuf,

    /// Repository name reported on binaries
    #[arg(short = 'r', long, default_value = "default")]
    repository: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file and print its fingerprint
    Put { file: PathBuf },

    /// Download a binary
    Get {
        fingerprint: String,

        /// Output file [default: stdout]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Print the stored length of a binary (0 when absent)
    Length { fingerprint: String },

    /// Delete a binary from the bucket
    Rm { fingerprint: String },

    /// List the bucket
    Ls {
        #[arg(long)]
        json: bool,
    },

    /// Collect binaries not listed in a marks file
    Gc {
        /// File with one live fingerprint per line
        #[arg(long)]
        marks: PathBuf,

        /// Delete unmarked binaries instead of only counting them
        #[arg(long)]
        delete: bool,
    },
}

fn parse_fingerprint(text: &str) -> anyhow::Result<Fingerprint> {
    Fingerprint::parse(text.trim()).with_context(|| format!("bad fingerprint '{}'", text))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = StoreConfig::from_toml_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let manager = BinaryManager::initialize(&args.repository, &config)?;

    match args.command {
        Command::Put { file } => {
            let input = File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let binary = manager.put(input)?;
            info!("Stored {} ({} bytes)", file.display(), binary.len());
            println!("{}", binary.fingerprint());
        }
        Command::Get {
            fingerprint,
            output,
        } => {
            let binary = manager.get(&parse_fingerprint(&fingerprint)?)?;
            let mut content = binary.open()?;
            match output {
                Some(path) => {
                    let mut out = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    io::copy(&mut content, &mut out)?;
                }
                None => {
                    io::copy(&mut content, &mut io::stdout().lock())?;
                }
            }
        }
        Command::Length { fingerprint } => {
            println!("{}", manager.length(&parse_fingerprint(&fingerprint)?)?);
        }
        Command::Rm { fingerprint } => {
            manager.remove(&parse_fingerprint(&fingerprint)?)?;
        }
        Command::Ls { json } => {
            let objects = manager.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&objects)?);
            } else {
                for object in &objects {
                    println!("{}\t{}", object.key, object.size);
                }
            }
        }
        Command::Gc { marks, delete } => {
            let reader = BufReader::new(
                File::open(&marks).with_context(|| format!("opening {}", marks.display()))?,
            );
            let gc = manager.gc();
            if gc.in_progress() {
                bail!("garbage collection {} already running", gc.id());
            }
            gc.start()?;
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                gc.mark(&parse_fingerprint(&line)?)?;
            }
            let status = gc.stop(delete)?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
