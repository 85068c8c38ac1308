pub mod api;
pub mod config;
pub mod enrich;
pub mod error;
pub mod export;
pub mod filter;
pub mod http_client;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod raw;
pub mod source;
