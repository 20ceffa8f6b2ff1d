mod database {
    pub mod actions;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod codec {
    pub mod image;
    pub mod shopping_list;
    pub mod shortlink;
}
mod constants;

mod cache {
    pub mod cache;
}

pub mod config;
pub mod logger;
pub mod server {
    pub mod context;
    pub mod handlers;
    pub mod payload;
    pub mod rejection;
    pub mod representation;
    pub mod routes;
}

pub use authentication::*;
pub use cache::cache::*;
pub use codec::*;
pub use constants::*;
pub use database::*;
