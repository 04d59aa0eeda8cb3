pub mod client;
pub mod kv;
mod record;
mod seed;
