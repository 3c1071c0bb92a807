pub mod art;
pub mod config;
pub mod enrich;
pub mod error;
pub mod lyrics;
pub mod response;
pub mod server;
pub mod track;
pub mod zone;
