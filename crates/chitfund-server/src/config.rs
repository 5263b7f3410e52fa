//! Command-line and environment configuration for the server binary.
//!
//! Every flag can also be supplied through a `CHITFUND_*` environment
//! variable; command-line arguments take precedence.

use std::path::PathBuf;

use chitfund_auth::AuthConfig;
use chitfund_db::DbConfig;
use clap::{Parser, ValueEnum};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "chitfund-server", version, about = "Chit-fund service")]
pub struct Cli {
    /// SurrealDB WebSocket address.
    #[arg(long, env = "CHITFUND_DB_URL", default_value = "127.0.0.1:8000")]
    pub db_url: String,

    #[arg(long, env = "CHITFUND_DB_NAMESPACE", default_value = "chitfund")]
    pub db_namespace: String,

    #[arg(long, env = "CHITFUND_DB_DATABASE", default_value = "main")]
    pub db_database: String,

    #[arg(long, env = "CHITFUND_DB_USERNAME", default_value = "root")]
    pub db_username: String,

    #[arg(long, env = "CHITFUND_DB_PASSWORD", default_value = "root", hide_env_values = true)]
    pub db_password: String,

    /// Path to the PEM-encoded Ed25519 signing key.
    #[arg(long, env = "CHITFUND_JWT_PRIVATE_KEY")]
    pub jwt_private_key: PathBuf,

    /// Path to the PEM-encoded Ed25519 verification key.
    #[arg(long, env = "CHITFUND_JWT_PUBLIC_KEY")]
    pub jwt_public_key: PathBuf,

    #[arg(long, env = "CHITFUND_JWT_ISSUER")]
    pub jwt_issuer: Option<String>,

    #[arg(long, env = "CHITFUND_JWT_AUDIENCE")]
    pub jwt_audience: Option<String>,

    /// Seconds between sweeps of expired refresh tokens and one-time codes.
    #[arg(long, env = "CHITFUND_CLEANUP_INTERVAL_SECS", default_value_t = 300)]
    pub cleanup_interval_secs: u64,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[arg(long, env = "CHITFUND_LOG", default_value = "chitfund=info,info")]
    pub log_filter: String,

    #[arg(long, env = "CHITFUND_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.db_url.clone(),
            namespace: self.db_namespace.clone(),
            database: self.db_database.clone(),
            username: self.db_username.clone(),
            password: self.db_password.clone(),
        }
    }

    /// Build the auth configuration from already-loaded key material.
    /// Issuer and audience fall back to the library defaults.
    pub fn auth_config(&self, private_key_pem: String, public_key_pem: String) -> AuthConfig {
        let defaults = AuthConfig::default();
        AuthConfig {
            jwt_private_key_pem: private_key_pem,
            jwt_public_key_pem: public_key_pem,
            jwt_issuer: self.jwt_issuer.clone().unwrap_or(defaults.jwt_issuer.clone()),
            jwt_audience: self.jwt_audience.clone().unwrap_or(defaults.jwt_audience.clone()),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec![
            "chitfund-server",
            "--jwt-private-key",
            "/keys/private.pem",
            "--jwt-public-key",
            "/keys/public.pem",
        ];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = parse(&[]);
        let db = cli.db_config();
        let expected = DbConfig::default();
        assert_eq!(db.url, expected.url);
        assert_eq!(db.namespace, expected.namespace);
        assert_eq!(db.database, expected.database);
        assert_eq!(cli.log_format, LogFormat::Json);

        let auth = cli.auth_config("priv".into(), "pub".into());
        assert_eq!(auth.jwt_issuer, "chitfund-app");
        assert_eq!(auth.jwt_audience, "chitfund-users");
        assert_eq!(auth.access_token_lifetime_secs, 900);
        assert_eq!(auth.jwt_private_key_pem, "priv");
    }

    #[test]
    fn overrides_are_applied() {
        let cli = parse(&[
            "--db-url",
            "db.internal:8000",
            "--jwt-issuer",
            "issuer-x",
            "--log-format",
            "text",
        ]);
        assert_eq!(cli.db_config().url, "db.internal:8000");
        assert_eq!(cli.auth_config(String::new(), String::new()).jwt_issuer, "issuer-x");
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn key_paths_are_required() {
        assert!(Cli::try_parse_from(["chitfund-server"]).is_err());
    }
}
