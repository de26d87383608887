//! Seams for host-engine integration.
//!
//! The storage layer deals in block and biome *names* and opaque NBT blobs.
//! Turning those into a game engine's runtime ids, biome tables or entity
//! attributes is the host's business; these traits are the contracts it
//! implements. None of them are required to load or save worlds.

use pile_format::{Chunk, Result};
use pile_nbt::Tag;
use std::io::Cursor;

/// Maps block-state names to the host's runtime ids and back.
pub trait BlockRegistry {
    fn runtime_id_for(&self, name: &str) -> Option<u32>;
    fn name_for(&self, runtime_id: u32) -> Option<&str>;
}

/// Maps biome names to the host's biome ids and back.
pub trait BiomeRegistry {
    fn biome_id_for(&self, name: &str) -> Option<u32>;
    fn name_for(&self, biome_id: u32) -> Option<&str>;
}

/// Converts between stored chunks and the host's own column representation.
///
/// [`crate::Provider::store_column`] and [`crate::Provider::load_column`]
/// operate on [`Chunk`] values; a host that keeps chunks in its own shape
/// runs them through an implementation of this trait at the boundary.
pub trait ColumnConverter {
    type Column;

    fn chunk_to_column(&self, chunk: &Chunk, min_section: i32, max_section: i32)
        -> Result<Self::Column>;

    fn column_to_chunk(
        &self,
        column: &Self::Column,
        x: i32,
        z: i32,
        min_section: i32,
        max_section: i32,
    ) -> Result<Chunk>;
}

/// Lazy field access over an opaque NBT blob.
///
/// Entity and block-entity payloads stay raw bytes in storage; converters
/// that need to peek at individual fields (an identifier, a position) go
/// through this rather than committing the core to an NBT object model.
pub trait NbtView: Sized {
    fn parse(data: &[u8]) -> Option<Self>;
    fn string_field(&self, name: &str) -> Option<String>;
    fn int_field(&self, name: &str) -> Option<i32>;
    fn long_field(&self, name: &str) -> Option<i64>;
    fn float_field(&self, name: &str) -> Option<f32>;
}

/// The bundled [`NbtView`] implementation, backed by `pile-nbt`. Parses the
/// blob once and serves field lookups from the root compound.
pub struct CompoundView {
    root: Tag,
}

impl NbtView for CompoundView {
    fn parse(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let (_, root) = Tag::read(&mut Cursor::new(data)).ok()?;
        root.as_compound()?;
        Some(CompoundView { root })
    }

    fn string_field(&self, name: &str) -> Option<String> {
        self.root.get(name).and_then(Tag::as_str).map(str::to_string)
    }

    fn int_field(&self, name: &str) -> Option<i32> {
        self.root.get(name).and_then(Tag::as_i32)
    }

    fn long_field(&self, name: &str) -> Option<i64> {
        self.root.get(name).and_then(Tag::as_i64)
    }

    fn float_field(&self, name: &str) -> Option<f32> {
        self.root.get(name).and_then(Tag::as_f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn compound_view_reads_fields_lazily() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "identifier".to_string(),
            Tag::String("minecraft:zombie".to_string()),
        );
        entries.insert("Health".to_string(), Tag::Float(17.5));
        entries.insert("UniqueID".to_string(), Tag::Long(-99));
        let mut blob = Vec::new();
        Tag::Compound(entries).write(&mut blob, "").unwrap();

        let view = CompoundView::parse(&blob).unwrap();
        assert_eq!(
            view.string_field("identifier").as_deref(),
            Some("minecraft:zombie")
        );
        assert_eq!(view.float_field("Health"), Some(17.5));
        assert_eq!(view.long_field("UniqueID"), Some(-99));
        assert_eq!(view.int_field("missing"), None);
    }

    #[test]
    fn non_compound_blobs_do_not_parse() {
        assert!(CompoundView::parse(&[]).is_none());
        let mut blob = Vec::new();
        Tag::Long(1).write(&mut blob, "").unwrap();
        assert!(CompoundView::parse(&blob).is_none());
    }
}
