pub mod deduper;
pub mod sink;
pub mod store;
pub mod watcher;
