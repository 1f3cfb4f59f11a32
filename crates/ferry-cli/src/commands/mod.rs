pub mod backfill;
pub mod dispatch;
pub mod run;
pub mod schema;
pub mod shared;
pub mod status;
pub mod validate;
