// crates/server/src/config.rs
//! Command-line and environment configuration for the `fontpack` binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use fontpack_core::paths;
use thiserror::Error;

use crate::jobs::DEFAULT_CONCURRENCY;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Parser)]
#[command(name = "fontpack", version, about = "Deduplicating icon-font build service")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "FONTPACK_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Port to listen on (falls back to $PORT)
    #[arg(long, env = "FONTPACK_PORT")]
    pub port: Option<u16>,

    /// Base URL download links are built from
    #[arg(long, env = "FONTPACK_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Root directory for finished and staged archives
    #[arg(long, env = "FONTPACK_RESULTS_DIR")]
    pub results_dir: Option<PathBuf>,

    /// Glyph catalog (embedded fonts JSON)
    #[arg(long, env = "FONTPACK_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Maximum number of builds running at once
    #[arg(long, env = "FONTPACK_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Executable that packages one font
    #[arg(long, env = "FONTPACK_BUILD_COMMAND")]
    pub build_command: PathBuf,

    /// Extra argument passed to the build command (repeatable)
    #[arg(long = "build-arg", allow_hyphen_values = true)]
    pub build_args: Vec<String>,

    /// Abort builds running longer than this
    #[arg(long, env = "FONTPACK_BUILD_TIMEOUT_SECS")]
    pub build_timeout_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a data directory; pass --{0}")]
    NoDataDir(&'static str),

    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub public_url: String,
    pub results_dir: PathBuf,
    pub catalog_path: PathBuf,
    pub concurrency: usize,
    pub build_command: PathBuf,
    pub build_args: Vec<String>,
    pub build_timeout: Option<Duration>,
}

impl Cli {
    /// Resolve defaults against the process environment.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let fallback_port = std::env::var("PORT").ok();
        self.resolve(fallback_port.as_deref())
    }

    fn resolve(self, fallback_port: Option<&str>) -> Result<ServerConfig, ConfigError> {
        let port = match (self.port, fallback_port) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.to_string()))?,
            (None, None) => DEFAULT_PORT,
        };

        let results_dir = match self.results_dir {
            Some(dir) => dir,
            None => paths::default_results_dir().ok_or(ConfigError::NoDataDir("results-dir"))?,
        };
        let catalog_path = match self.catalog {
            Some(path) => path,
            None => paths::default_catalog_path().ok_or(ConfigError::NoDataDir("catalog"))?,
        };

        Ok(ServerConfig {
            addr: SocketAddr::new(self.bind, port),
            public_url: self
                .public_url
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            results_dir,
            catalog_path,
            concurrency: self.concurrency.max(1),
            build_command: self.build_command,
            build_args: self.build_args,
            build_timeout: self
                .build_timeout_secs
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["fontpack", "--build-command", "/usr/bin/fontbuild"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_explicit_values() {
        let config = parse(&[
            "--bind",
            "0.0.0.0",
            "--port",
            "8080",
            "--public-url",
            "https://fonts.example.com",
            "--results-dir",
            "/srv/fontpack",
            "--catalog",
            "/etc/fontpack/fonts.json",
            "--concurrency",
            "8",
            "--build-arg",
            "--verbose",
            "--build-arg",
            "zip",
            "--build-timeout-secs",
            "30",
        ])
        .resolve(None)
        .unwrap();

        assert_eq!(
            config,
            ServerConfig {
                addr: "0.0.0.0:8080".parse().unwrap(),
                public_url: "https://fonts.example.com".into(),
                results_dir: "/srv/fontpack".into(),
                catalog_path: "/etc/fontpack/fonts.json".into(),
                concurrency: 8,
                build_command: "/usr/bin/fontbuild".into(),
                build_args: vec!["--verbose".into(), "zip".into()],
                build_timeout: Some(Duration::from_secs(30)),
            }
        );
    }

    #[test]
    fn test_port_fallback_and_default_url() {
        let cli = parse(&["--results-dir", "/tmp/r", "--catalog", "/tmp/c.json"]);
        let config = cli.resolve(Some("9000")).unwrap();
        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.addr.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.public_url, "http://localhost:9000");

        let cli = parse(&["--results-dir", "/tmp/r", "--catalog", "/tmp/c.json"]);
        assert_eq!(cli.resolve(None).unwrap().addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_explicit_port_beats_fallback() {
        let cli = parse(&["--port", "1234", "--results-dir", "/r", "--catalog", "/c"]);
        assert_eq!(cli.resolve(Some("9000")).unwrap().addr.port(), 1234);
    }

    #[test]
    fn test_invalid_fallback_port() {
        let cli = parse(&["--results-dir", "/r", "--catalog", "/c"]);
        let err = cli.resolve(Some("http")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort(_)));
    }

    #[test]
    fn test_concurrency_and_timeout_floors() {
        let cli = parse(&[
            "--concurrency",
            "0",
            "--build-timeout-secs",
            "0",
            "--results-dir",
            "/r",
            "--catalog",
            "/c",
        ]);
        let config = cli.resolve(None).unwrap();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.build_timeout, None);
        assert_eq!(cli_default_concurrency(), DEFAULT_CONCURRENCY);
    }

    fn cli_default_concurrency() -> usize {
        parse(&[]).concurrency
    }

    #[test]
    fn test_build_command_required() {
        assert!(Cli::try_parse_from(["fontpack"]).is_err());
    }
}
