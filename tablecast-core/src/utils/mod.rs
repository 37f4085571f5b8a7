pub mod backoff;
pub mod versioned_store;
