//! Redb table definitions for the persistent key-value store.

use redb::TableDefinition;

// Key: logical key (e.g. "catalog:ledger"), Value: UTF-8 string value
pub const ENTRIES: TableDefinition<&str, &str> = TableDefinition::new("entries");
