pub mod error;
pub mod gvcf;
pub mod histogram;
pub mod io;
pub mod join;
pub mod record;
pub mod shard;
pub mod tracker;
