pub mod api;
pub mod cfg;
pub mod cmd;
pub mod discovery;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod pool;
pub mod report;
pub mod runtime;
mod shaper;
pub mod shutdown;
pub mod stat;
