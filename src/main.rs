use anyhow::Context as _;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use foodgram::{
    config::Config,
    logger,
    server::{context::Context, routes::routes},
    Cache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();
    logger::init(config.log_level)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to the database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("running migrations")?;

    let cache = match &config.redis_url {
        Some(url) => Cache::connect(url).await,
        None => {
            log::warn!("REDIS_URL is not set, tags and ingredients are served uncached");
            Cache::disabled()
        }
    };

    tokio::fs::create_dir_all(&config.media_root)
        .await
        .with_context(|| format!("creating {}", config.media_root.display()))?;

    let address = config.bind_address;
    let context = Context::new(config, pool, cache);

    log::info!("Listening on {address}");
    warp::serve(routes(context)).run(address).await;

    Ok(())
}
