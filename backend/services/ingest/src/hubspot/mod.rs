pub mod associations;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod normalize;
pub mod objects;
pub mod query;
pub mod retry;
pub mod sync;
pub mod token;
