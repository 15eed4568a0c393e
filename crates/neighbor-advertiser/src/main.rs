//! neighbor_advertiser entry point

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sonic_cfgmgr_common::{RedisConfig, RedisConfigDb};
use sonic_neighbor_advertiser::config::DEFAULT_CONFIG_PATH;
use sonic_neighbor_advertiser::{
    parse_candidates, Advertiser, AdvertiserConfig, AdvertiserError, HttpSliceTransport, Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// What to do with the responder path
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Negotiate a responder and install the responder path
    Set,
    /// Remove the responder path
    Reset,
}

/// SONiC neighbor advertiser
#[derive(Parser, Debug)]
#[command(name = "neighbor_advertiser")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Operation mode
    #[arg(short = 'm', long, value_enum)]
    mode: Mode,

    /// Comma separated Ferret service candidates, tried in order
    #[arg(short = 's', long)]
    server: Option<String>,

    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Redis server host (overrides the configuration file)
    #[arg(long)]
    redis_host: Option<String>,

    /// Redis server port (overrides the configuration file)
    #[arg(long)]
    redis_port: Option<u16>,

    /// Directory for request/response snapshots (overrides the configuration file)
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut AdvertiserConfig) {
        if let Some(host) = &self.redis_host {
            config.database.redis_host = host.clone();
        }
        if let Some(port) = self.redis_port {
            config.database.redis_port = port;
        }
        if let Some(dir) = &self.dump_dir {
            config.paths.dump_dir = dir.clone();
        }
    }

    fn candidates(&self) -> Result<Vec<String>> {
        self.server
            .as_deref()
            .ok_or(AdvertiserError::NoCandidates)
            .and_then(parse_candidates)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_error_chain(err: &AdvertiserError) {
    error!("{}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        error!("  caused by: {}", cause);
        source = cause.source();
    }
}

async fn run(args: &Args) -> Result<()> {
    let mut config = AdvertiserConfig::load_or_default(&args.config)?;
    args.apply_overrides(&mut config);
    config.validate()?;

    // Checked before connecting so a bad invocation never touches CONFIG_DB
    let candidates = match args.mode {
        Mode::Set => args.candidates()?,
        Mode::Reset => Vec::new(),
    };

    let redis = RedisConfig::new(
        config.database.redis_host.clone(),
        config.database.redis_port,
        config.database.config_db_number,
    );
    let mut db = RedisConfigDb::connect(redis).await?;

    match args.mode {
        Mode::Set => {
            let transport = HttpSliceTransport::new(config.request_timeout())?;
            let responder = Advertiser::new(&mut db, config)
                .set(&transport, &candidates)
                .await?;
            info!("Responder {} installed", responder);
        }
        Mode::Reset => {
            Advertiser::new(&mut db, config).reset().await?;
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    info!(mode = ?args.mode, "Starting neighbor_advertiser");

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error_chain(&e);
            ExitCode::FAILURE
        }
    }
}
