pub mod args;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod scrape;
pub mod token;
pub mod transport;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use error::Error;

use crate::{
    args::Cli,
    auth::authenticate,
    config::{load_config, load_params, AppConfig},
    gateway::{call_api, current_tokens},
    token::{default_token_path, TokenCache},
    transport::{Transport, TransportSettings},
};

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let cache = TokenCache::new(args.token_file.clone().unwrap_or_else(default_token_path));

    if args.clear_token {
        cache.clear()?;
        info!("Deleted token file at {}", cache.path().display());
        return Ok(());
    }

    let config = load_config(args.env.as_deref())?;
    let mut transport = Transport::new(TransportSettings {
        accept_invalid_certs: !args.verify_tls,
        ..TransportSettings::default()
    })?;

    let outcome = if args.login {
        authenticate(&config, &transport, &cache).await.map(|_| ())
    } else if args.print_token {
        print_token(&config, &transport, &cache).await
    } else {
        let path = args.path.as_deref().unwrap_or_default();
        let params = load_params(&args.params_file)?;
        call_api(&config, &mut transport, &cache, path, &params)
            .await
            .map(|body| println!("{body}"))
    };

    if let Err(err) = &outcome {
        if let Some(raw) = err.raw_response() {
            error!("response: {raw}");
        }
    }
    Ok(outcome?)
}

async fn print_token(
    config: &AppConfig,
    transport: &Transport,
    cache: &TokenCache,
) -> Result<(), Error> {
    let token = current_tokens(config, transport, cache).await?;
    println!("{}", token.access_token);
    Ok(())
}
