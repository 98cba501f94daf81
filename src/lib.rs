//! Songplays star-schema ETL.
//!
//! Drops and recreates seven warehouse tables, bulk-stages raw song and
//! event JSON into two staging tables, then derives one fact table and four
//! dimension tables with `INSERT ... SELECT`.

pub mod cli;
pub mod config;
pub mod error;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod sql;
pub mod warehouse;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use config::{Dialect, DwhConfig};
pub use error::{EtlError, EtlResult};
pub use pipeline::Pipeline;
