use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use visreg_backend_core::api::server::serve;

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let port = resolve_port(std::env::var("PORT").ok().as_deref())?;
    let data_root = std::env::var("VISREG_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("backstop_data"));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    serve(addr, data_root).await?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

fn resolve_port(raw: Option<&str>) -> Result<u16, Box<dyn std::error::Error>> {
    match raw {
        Some(value) => {
            let port = value.trim().parse::<u16>().map_err(|err| {
                std::io::Error::other(format!("Invalid PORT value '{value}': {err}"))
            })?;
            Ok(port)
        }
        None => Ok(DEFAULT_PORT),
    }
}
