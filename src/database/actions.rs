pub mod collections;
pub mod ingredients;
pub mod recipes;
pub mod sessions;
pub mod subscriptions;
pub mod tags;
pub mod users;
