use std::sync::Arc;

use once_cell::sync::Lazy;

use super::model::{Settings, load_settings};

/// Process-wide settings, read once from `REFINER_CONFIG` (default `config`).
pub static CONFIG: Lazy<Arc<Settings>> = Lazy::new(|| {
    let settings = load_settings().expect("Failed to load refiner configuration");
    Arc::new(settings)
});
