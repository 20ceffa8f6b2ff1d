use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use sqlx::postgres::PgPoolOptions;

use foodgram::{
    actions::ingredients::insert_ingredient, logger, rotate_cache_bind, INGREDIENT_CACHE_BIND,
};

const PROGRESS_EVERY: usize = 100;

/// Imports `name,measurement_unit` rows into the ingredient catalog; rows already present are skipped.
#[derive(Parser, Debug)]
#[command(name = "load_ingredients", version)]
struct Args {
    #[arg(default_value = "data/ingredients.csv")]
    path: PathBuf,

    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Deserialize, Debug)]
struct IngredientRecord {
    name: String,
    measurement_unit: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    logger::init(args.log_level)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&args.database_url)
        .await
        .context("connecting to the database")?;

    // the file has no header row
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(&args.path)
        .with_context(|| format!("opening {}", args.path.display()))?;

    let (mut read, mut inserted) = (0usize, 0usize);
    for record in reader.deserialize::<IngredientRecord>() {
        let record = record.with_context(|| format!("reading row {}", read + 1))?;
        read += 1;

        if insert_ingredient(&pool, &record.name, &record.measurement_unit)
            .await
            .map_err(|e| anyhow::anyhow!("inserting {:?}: {:?}", record.name, e.info))?
        {
            inserted += 1;
        }

        if read % PROGRESS_EVERY == 0 {
            log::info!("Processed {read} rows, {inserted} new");
        }
    }
    log::info!("Done: {read} rows, {inserted} new ingredients");

    if let Some(url) = args.redis_url {
        let client = redis::Client::open(url.as_str())?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        rotate_cache_bind(INGREDIENT_CACHE_BIND, &mut connection)
            .await
            .map_err(|e| anyhow::anyhow!("invalidating the ingredient cache: {:?}", e.info))?;
    }

    Ok(())
}
