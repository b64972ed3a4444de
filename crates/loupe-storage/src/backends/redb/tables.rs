//! Physical table layout and key encoding.
//!
//! Logical tables share one physical Redb table; a key is stored as
//! `<table name> 0x00 <key>`, so each logical table occupies one contiguous
//! key range.

use redb::TableDefinition;

/// The physical table that stores all key-value pairs.
pub const DATA_TABLE: TableDefinition<'static, &[u8], &[u8]> = TableDefinition::new("loupe_data");

/// Separator byte between table name and key in the encoded key.
pub const KEY_SEPARATOR: u8 = 0x00;

/// Encode a logical table name and key into a physical key.
pub fn encode_key(table: &str, key: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(table.len() + 1 + key.len());
    encoded.extend_from_slice(table.as_bytes());
    encoded.push(KEY_SEPARATOR);
    encoded.extend_from_slice(key);
    encoded
}

/// Split a physical key into its logical table name and original key.
///
/// Returns `None` for a key without a separator or with a non-UTF-8 table name.
pub fn decode_key(encoded: &[u8]) -> Option<(&str, &[u8])> {
    let sep_pos = encoded.iter().position(|&b| b == KEY_SEPARATOR)?;
    let table = std::str::from_utf8(&encoded[..sep_pos]).ok()?;
    Some((table, &encoded[sep_pos + 1..]))
}

/// First physical key of a logical table.
pub fn table_start_key(table: &str) -> Vec<u8> {
    encode_key(table, &[])
}

/// First physical key past the end of a logical table.
pub fn table_end_key(table: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(table.len() + 1);
    key.extend_from_slice(table.as_bytes());
    key.push(KEY_SEPARATOR + 1);
    key
}

/// Logical tables used by the catalog.
pub mod names {
    /// Catalog entries keyed by catalog ID.
    pub const CATALOG_ENTRIES: &str = "catalog_entries";

    /// Catalog metadata: dimension, metric and the insertion counter.
    pub const CATALOG_META: &str = "catalog_meta";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_key() {
        let encoded = encode_key(names::CATALOG_ENTRIES, b"ring-001");
        let (table, key) = decode_key(&encoded).unwrap();
        assert_eq!(table, names::CATALOG_ENTRIES);
        assert_eq!(key, b"ring-001");
    }

    #[test]
    fn empty_key_round_trips() {
        let encoded = encode_key(names::CATALOG_META, b"");
        let (table, key) = decode_key(&encoded).unwrap();
        assert_eq!(table, names::CATALOG_META);
        assert!(key.is_empty());
    }

    #[test]
    fn table_bounds_enclose_every_key() {
        let start = table_start_key("catalog_entries");
        let end = table_end_key("catalog_entries");
        let key = encode_key("catalog_entries", &[0xFF, 0xFF]);
        assert!(start <= key);
        assert!(key < end);

        // A table whose name extends another's must stay outside its range.
        let other = encode_key("catalog_entries_old", b"x");
        assert!(other >= end || other < start);
    }

    #[test]
    fn decode_rejects_missing_separator() {
        assert!(decode_key(b"no-separator").is_none());
    }
}
