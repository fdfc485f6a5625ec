pub mod record_factory;

pub use record_factory::{RecordFactory, records_from};
