pub mod config;
pub mod storage;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::core::AdapterFactory;

pub use self::config::{ConfigAdapter, CONFIG_ADAPTER_NAME};
pub use self::storage::{StorageAdapter, StorageSettings};

/// Adapters every catalog starts with, keyed by implementation name.
static BUILTIN_ADAPTERS: Lazy<HashMap<&'static str, AdapterFactory>> = Lazy::new(|| {
    let arr: Vec<(&str, AdapterFactory)> = vec![
        (config::IMPLEMENTATION, config::create_config_adapter),
        (storage::IMPLEMENTATION, storage::create_storage_adapter),
    ];
    arr.into_iter().collect()
});

/// Built-in adapter factories, for seeding a [`Catalog`](crate::core::Catalog)
pub fn builtin_adapters() -> impl Iterator<Item = (&'static str, AdapterFactory)> {
    BUILTIN_ADAPTERS.iter().map(|(name, factory)| (*name, *factory))
}
