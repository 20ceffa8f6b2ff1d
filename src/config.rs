use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

const MAX_TOKEN_LIFETIME_HOURS: i64 = 24 * 366;

/// Server settings; every flag can also come from the environment or a `.env` file.
#[derive(Parser, Debug, Clone)]
#[command(name = "foodgram", version, about = "Recipe sharing api server")]
pub struct Config {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    pub bind_address: SocketAddr,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Tags and ingredients are served uncached without it.
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    #[arg(long, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: String,

    /// At most a year.
    #[arg(
        long,
        env = "TOKEN_LIFETIME_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_LIFETIME_HOURS)
    )]
    pub token_lifetime_hours: i64,

    /// Public origin used for media urls, page links and short links.
    #[arg(long, env = "BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    #[arg(long, env = "MEDIA_ROOT", default_value = "media")]
    pub media_root: PathBuf,

    #[arg(long, env = "SHORT_LINK_SALT", default_value = "random_salt")]
    pub short_link_salt: String,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: log::LevelFilter,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "foodgram",
            "--database-url",
            "postgres://localhost/foodgram",
            "--secret-key",
            "s3cret",
            "--base-url",
            "https://food.example/",
            "--log-level",
            "debug",
        ]);
        let Ok(config) = config else {
            panic!("flags rejected");
        };

        assert_eq!(config.base_url(), "https://food.example");
        assert_eq!(config.log_level, log::LevelFilter::Debug);
        assert_eq!(config.token_lifetime_hours, 24);
    }

    #[test]
    fn token_lifetime_is_bounded() {
        let parse = |hours: &str| {
            Config::try_parse_from([
                "foodgram",
                "--database-url",
                "postgres://localhost/foodgram",
                "--secret-key",
                "s3cret",
                "--token-lifetime-hours",
                hours,
            ])
            .map(|config| config.token_lifetime_hours)
        };

        assert_eq!(parse("720").ok(), Some(720));
        assert!(parse("0").is_err());
        assert!(parse("-5").is_err());
        assert!(parse("9223372036854775807").is_err());
    }

    #[test]
    fn secret_is_required() {
        let config = Config::try_parse_from([
            "foodgram",
            "--database-url",
            "postgres://localhost/foodgram",
        ]);

        if std::env::var("SECRET_KEY").is_err() {
            assert!(config.is_err());
        }
    }
}
