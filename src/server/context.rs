use std::{convert::Infallible, sync::Arc};

use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{
    cache::cache::Cache, codec::image::MediaStore, codec::shortlink::ShortLinkCodec,
    config::Config,
};

/// Everything a handler needs, cheap to clone per request.
#[derive(Clone)]
pub struct Context {
    pub pool: Pool<Postgres>,
    pub cache: Cache,
    pub media: MediaStore,
    pub links: ShortLinkCodec,
    pub config: Arc<Config>,
}

impl Context {
    pub fn new(config: Config, pool: Pool<Postgres>, cache: Cache) -> Self {
        Self {
            media: MediaStore::new(config.media_root.clone(), config.base_url()),
            links: ShortLinkCodec::new(&config.short_link_salt),
            pool,
            cache,
            config: Arc::new(config),
        }
    }

    pub fn short_link(&self, code: &str) -> String {
        format!("{}/s/{}/", self.config.base_url(), code)
    }

    /// Frontend page of a recipe, where short links lead.
    pub fn recipe_page(&self, recipe_id: i32) -> String {
        format!("{}/recipes/{}", self.config.base_url(), recipe_id)
    }
}

pub fn with_context(
    context: Context,
) -> impl Filter<Extract = (Context,), Error = Infallible> + Clone {
    warp::any().map(move || context.clone())
}
