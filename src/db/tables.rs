use redb::TableDefinition;

/// Footprints table: footprint id (UUID v4 string) -> FootprintRecord (serialized)
pub const FOOTPRINTS: TableDefinition<&str, &[u8]> = TableDefinition::new("footprints");
