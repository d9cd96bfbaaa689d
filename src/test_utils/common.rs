use std::sync::Arc;

use crate::DbConnector;
use crate::FieldValue;
use crate::MemStore;

/// Owned field list from string pairs
pub(crate) fn fvs(pairs: &[(&str, &str)]) -> Vec<FieldValue> {
    pairs
        .iter()
        .map(|(f, v)| (f.to_string(), v.to_string()))
        .collect()
}

/// `APPL_DB` connector over a fresh in-memory store, `:` separated
pub(crate) fn mem_connector() -> DbConnector {
    DbConnector::new(Arc::new(MemStore::new()), crate::APPL_DB, 0, ":")
}
