use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use tiffinder_core::{records, Config, NamingPolicy, TifFinder};

#[derive(Parser)]
#[command(name = "tiffinder")]
#[command(about = "Find TIFF masters by inventory identifier")]
#[command(version)]
struct Cli {
    /// Path to the index cache file
    #[arg(short, long, global = true, default_value = ".tif_cache.json")]
    cache: PathBuf,

    /// Path to a configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan directories for TIFF files and update the cache
    Scan {
        /// Directories to scan
        #[arg(required = true)]
        roots: Vec<PathBuf>,

        /// Only rescan when the cache has gone stale; prunes dead entries
        #[arg(short, long)]
        intelligent: bool,
    },

    /// Print the cache contents and entry count
    Show,

    /// Look up needles and copy, preview or log the matches
    #[command(group(
        ArgGroup::new("input")
            .required(true)
            .args(["needle", "needles", "records"])
    ))]
    #[command(group(ArgGroup::new("action").args(["preview", "log_only"])))]
    Search {
        /// A single needle to look up
        needle: Option<String>,

        /// File with one needle per line (first column)
        #[arg(short = 'x', long)]
        needles: Option<PathBuf>,

        /// File with identifier,object-id records; matches are copied
        /// under the object-id.hash naming scheme
        #[arg(short = 'm', long)]
        records: Option<PathBuf>,

        /// Target directory to write to; defaults to the current directory
        #[arg(short, long, default_value = ".")]
        target: PathBuf,

        /// Write bounded jpg previews instead of copying the masters
        #[arg(short, long)]
        preview: bool,

        /// Write only the report log, no image data
        #[arg(short = 'j', long)]
        log_only: bool,
    },

    /// Generate a default configuration file
    GenerateConfig {
        /// Path to save the configuration file
        #[arg(default_value = "tiffinder.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Scan { roots, intelligent } => {
            // a broken cache is rebuilt rather than blocking the scan
            let mut finder = TifFinder::open_or_rebuild(&cli.cache, config)
                .with_context(|| format!("opening cache {}", cli.cache.display()))?;
            if intelligent {
                let rescanned = finder.refresh(&roots)?;
                if rescanned {
                    info!("Cache refreshed");
                } else {
                    println!("Cache still young, nothing to do");
                }
            } else {
                let added = finder.scan(&roots)?;
                println!("Indexed {} files", added);
            }
            Ok(())
        }

        Commands::Show => {
            let finder = TifFinder::open(&cli.cache, config)?;
            for (path, key) in finder.index().iter() {
                println!(" {} [{}]", path.display(), key);
            }
            println!("Number of tifs in cache: {}", finder.index().len());
            Ok(())
        }

        Commands::Search {
            needle,
            needles,
            records: record_fn,
            target,
            preview,
            log_only,
        } => {
            let finder = TifFinder::open(&cli.cache, config)?;

            // resolve the record stream to one batch of matches; identifier
            // records get the hash-based naming scheme on copy
            let (matches, hash_names) = if let Some(needle) = needle {
                (finder.search_records(&[records::Record::needle(needle)]), false)
            } else if let Some(path) = needles {
                let batch = records::needles_from_csv(&path)?;
                (finder.search_records(&batch), false)
            } else {
                let path = record_fn.expect("clap guarantees one input");
                let batch = records::records_from_csv(&path)?;
                (finder.search_records(&batch), true)
            };

            let found: usize = matches.iter().map(|m| m.paths.len()).sum();
            for m in &matches {
                info!("'{}': {} match(es)", m.identifier, m.paths.len());
            }
            println!("Found {} file(s) for {} needle(s)", found, matches.len());

            let paths: Vec<PathBuf> = matches.iter().flat_map(|m| m.paths.clone()).collect();
            let mut materializer = finder
                .materializer(&target)
                .with_context(|| format!("target {}", target.display()))?;

            let report = if log_only {
                materializer.log_only(&paths)
            } else if preview {
                materializer.preview_all(&paths)
            } else if hash_names {
                materializer.copy_records(&matches)
            } else {
                materializer.copy_all(&paths, &NamingPolicy::Preserve)
            };

            println!("{}", report.summary());
            Ok(())
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(())
        }
    }
}
