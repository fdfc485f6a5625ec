pub use super::factories::{RecordFactory, records_from};

pub struct Factory;

impl Factory {
    pub fn record() -> RecordFactory {
        RecordFactory::new()
    }
}
