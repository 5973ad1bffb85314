use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kiokun_lookup::{LookupClient, LookupConfig, LookupOutcome, SourceConfig};
use kiokun_routing::{classify, route, stable_hash, ShardCeiling, ShardSetGeneration};
use tokio_util::sync::CancellationToken;

use crate::separate;

#[derive(Parser)]
#[command(name = "kiokun")]
#[command(about = "Kiokun dictionary shard routing and lookup tool", long_about = None)]
pub struct Cli {
    /// Lookup configuration file (.toml or .json)
    #[arg(short, long, global = true, env = "KIOKUN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Shard-set generation, overriding the configuration
    #[arg(short, long, global = true)]
    pub generation: Option<ShardSetGeneration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the classification and hash of a key
    Classify { key: String },
    /// Print the shard a key routes to
    Route { key: String },
    /// List the shards of the generation in table order
    Shards,
    /// Look up a key and print its entry
    Lookup {
        key: String,
        #[arg(long, conflicts_with = "root")]
        base_url: Option<String>,
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Copy a flat directory of entry documents into shard directories
    Separate {
        #[arg(short, long)]
        source: PathBuf,
        #[arg(short, long)]
        dest: PathBuf,
        #[arg(long, default_value = "20000")]
        max_files: u64,
        #[arg(long, default_value = "1073741824")]
        max_bytes: u64,
    },
    /// Print how a flat directory of entry documents would distribute
    Report {
        #[arg(short, long)]
        source: PathBuf,
        #[arg(long, default_value = "20000")]
        max_files: u64,
        #[arg(long, default_value = "1073741824")]
        max_bytes: u64,
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Loads the configuration file if one was given and applies flag overrides.
    pub fn load_config(&self) -> Result<LookupConfig> {
        let mut config = match &self.config {
            Some(path) => LookupConfig::from_file(path)?,
            None => LookupConfig::default(),
        };
        if let Some(generation) = self.generation {
            config.generation = generation;
        }
        if let Command::Lookup { base_url, root, .. } = &self.command {
            if let Some(base_url) = base_url {
                config.source = SourceConfig::Http {
                    base_url: base_url.clone(),
                };
            } else if let Some(root) = root {
                config.source = SourceConfig::Fs { root: root.clone() };
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub async fn run(self, config: LookupConfig) -> Result<ExitCode> {
        let generation = config.generation;
        match self.command {
            Command::Classify { ref key } => {
                let c = classify(key);
                let out = serde_json::json!({
                    "key": key,
                    "ideograph_count": c.ideograph_count,
                    "has_kana": c.has_kana,
                    "length": c.length,
                    "hash": stable_hash(key),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
                Ok(ExitCode::SUCCESS)
            }
            Command::Route { ref key } => {
                println!("{}", route(key, generation));
                Ok(ExitCode::SUCCESS)
            }
            Command::Shards => {
                for shard in generation.shards() {
                    println!("{:>2}  {}", shard.index(), shard);
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::Lookup { ref key, .. } => Ok(ExitCode::from(lookup(&config, key).await?)),
            Command::Separate {
                ref source,
                ref dest,
                max_files,
                max_bytes,
            } => {
                let ceiling = ShardCeiling {
                    max_files,
                    max_bytes,
                };
                let report = separate::separate(source, dest, generation, ceiling)?;
                print!("{}", separate::render_report(&report));
                Ok(ExitCode::SUCCESS)
            }
            Command::Report {
                ref source,
                max_files,
                max_bytes,
                json,
            } => {
                let ceiling = ShardCeiling {
                    max_files,
                    max_bytes,
                };
                let report = separate::report(source, generation, ceiling)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print!("{}", separate::render_report(&report));
                }
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Runs a single lookup, cancelled by Ctrl-C.
///
/// Exit status 1 means no such entry, 2 means the lookup failed.
async fn lookup(config: &LookupConfig, key: &str) -> Result<u8> {
    let client = LookupClient::from_config(config)?;
    let token = CancellationToken::new();
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };

    let result = client.lookup_cancellable(key, &token).await;
    interrupt.abort();

    match result {
        Ok(LookupOutcome::Found(resolved)) => {
            if let Some(origin) = &resolved.redirected_from {
                tracing::info!("{} redirected to {}", origin, resolved.key);
            }
            println!("{}", serde_json::to_string_pretty(&resolved.entry.to_json())?);
            Ok(0)
        }
        Ok(LookupOutcome::NotFound { key, shard }) => {
            tracing::debug!("{} not present in shard {}", key, shard);
            eprintln!("no such entry");
            Ok(1)
        }
        Err(e) => {
            tracing::error!("lookup of {:?} failed: {}", key, e);
            eprintln!("{}", e.user_message());
            Ok(2)
        }
    }
}
