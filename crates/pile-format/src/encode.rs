//! World payload serialization.
//!
//! The payload layout is: section range, world user data, chunk count, then
//! each chunk. Chunk iteration order follows the in-memory map and is not
//! part of the format.

use crate::binary::PileWriter;
use crate::error::Result;
use crate::world::{BlockEntity, Chunk, Section, World, AIR, PLAINS};
use std::io::Write;

pub fn encode_world<W: Write>(out: &mut PileWriter<W>, world: &World) -> Result<()> {
    out.write_i32(world.min_section())?;
    out.write_i32(world.max_section())?;
    out.write_bytes(&world.user_data)?;

    out.write_varint(world.chunk_count() as i64)?;
    for chunk in world.chunks() {
        encode_chunk(out, chunk, world.section_count())?;
    }
    Ok(())
}

/// Encodes one chunk. Exactly `section_count` sections are emitted; vacant or
/// empty slots become the canonical empty section.
pub fn encode_chunk<W: Write>(
    out: &mut PileWriter<W>,
    chunk: &Chunk,
    section_count: usize,
) -> Result<()> {
    out.write_i32(chunk.x)?;
    out.write_i32(chunk.z)?;

    for i in 0..section_count {
        match chunk.sections.get(i).and_then(Option::as_ref) {
            Some(section) if !section.is_empty() => encode_section(out, section)?,
            _ => encode_empty_section(out)?,
        }
    }

    out.write_varint(chunk.block_entities.len() as i64)?;
    for block_entity in &chunk.block_entities {
        encode_block_entity(out, block_entity)?;
    }

    out.write_varint(chunk.entities.len() as i64)?;
    for entity in &chunk.entities {
        // Identifier and UUID come first so indexers can skip the rest.
        out.write_string(&entity.id)?;
        out.write_string(&entity.uuid.to_string())?;
        for v in entity.position {
            out.write_f32(v)?;
        }
        for v in entity.rotation {
            out.write_f32(v)?;
        }
        for v in entity.velocity {
            out.write_f32(v)?;
        }
        out.write_bytes(&entity.data)?;
    }

    out.write_varint(chunk.scheduled_ticks.len() as i64)?;
    for tick in &chunk.scheduled_ticks {
        out.write_u8(tick.packed_xz)?;
        out.write_i32(tick.y)?;
        out.write_string(&tick.block)?;
        out.write_varint(tick.tick)?;
    }

    out.write_bytes(&chunk.heightmaps)?;
    out.write_bytes(&chunk.user_data)
}

fn encode_section<W: Write>(out: &mut PileWriter<W>, section: &Section) -> Result<()> {
    out.write_varint(section.blocks.palette().len() as i64)?;
    for entry in section.blocks.palette() {
        out.write_string(entry)?;
    }
    out.write_varint(section.blocks.data().len() as i64)?;
    for word in section.blocks.data() {
        out.write_i64(*word)?;
    }

    out.write_varint(section.biomes.palette().len() as i64)?;
    for entry in section.biomes.palette() {
        out.write_string(entry)?;
    }
    out.write_varint(section.biomes.data().len() as i64)?;
    for word in section.biomes.data() {
        out.write_i64(*word)?;
    }
    Ok(())
}

/// The canonical encoding of an all-air section: single-entry palettes and no
/// index data.
fn encode_empty_section<W: Write>(out: &mut PileWriter<W>) -> Result<()> {
    out.write_varint(1)?;
    out.write_string(AIR)?;
    out.write_varint(0)?;

    out.write_varint(1)?;
    out.write_string(PLAINS)?;
    out.write_varint(0)
}

fn encode_block_entity<W: Write>(out: &mut PileWriter<W>, block_entity: &BlockEntity) -> Result<()> {
    out.write_u8(block_entity.packed_xz)?;
    out.write_i32(block_entity.y)?;
    out.write_string(&block_entity.id)?;
    out.write_bytes(&block_entity.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{pack_xz, ScheduledTick};

    /// Canonical empty section: varint 1, "minecraft:air", varint 0, then
    /// varint 1, "minecraft:plains", varint 0 (varints are zigzag).
    const EMPTY_SECTION: &[u8] = &[
        0x02, 0x1A, b'm', b'i', b'n', b'e', b'c', b'r', b'a', b'f', b't', b':', b'a', b'i', b'r',
        0x00, 0x02, 0x20, b'm', b'i', b'n', b'e', b'c', b'r', b'a', b'f', b't', b':', b'p', b'l',
        b'a', b'i', b'n', b's', 0x00,
    ];

    fn encoded(world: &World) -> Vec<u8> {
        let mut out = PileWriter::new(Vec::new());
        encode_world(&mut out, world).unwrap();
        out.into_inner()
    }

    #[test]
    fn empty_world_payload() {
        let world = World::new(-4, 20);
        assert_eq!(
            encoded(&world),
            &[0xFF, 0xFF, 0xFF, 0xFC, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00]
        );
    }

    #[test]
    fn vacant_section_slot_encodes_canonically() {
        let mut out = PileWriter::new(Vec::new());
        encode_empty_section(&mut out).unwrap();
        assert_eq!(out.into_inner(), EMPTY_SECTION);
    }

    #[test]
    fn present_but_air_only_section_encodes_canonically() {
        // A section that was touched (biome set) but holds only air must
        // still collapse to the canonical empty bytes.
        let mut world = World::new(0, 1);
        let mut chunk = Chunk::new(0, 0, 1);
        chunk
            .section_mut(0)
            .unwrap()
            .set_biome_at(1, 2, 3, "minecraft:desert");
        world.set_chunk(chunk);

        let mut expected = vec![
            0x00, 0x00, 0x00, 0x00, // min section
            0x00, 0x00, 0x00, 0x01, // max section
            0x00, // world user data
            0x02, // one chunk
            0x00, 0x00, 0x00, 0x00, // chunk x
            0x00, 0x00, 0x00, 0x00, // chunk z
        ];
        expected.extend_from_slice(EMPTY_SECTION);
        expected.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(encoded(&world), expected);
    }

    #[test]
    fn sectionless_chunk_pads_all_sections() {
        let mut world = World::new(-4, 20);
        world.set_chunk(Chunk::new(0, 0, 0));
        let bytes = encoded(&world);

        // Payload head (10 bytes with a chunk count of 1) plus chunk coords.
        let chunk_body = &bytes[10 + 8..];
        assert_eq!(chunk_body.len(), 24 * EMPTY_SECTION.len() + 5);
        for i in 0..24 {
            assert_eq!(
                &chunk_body[i * EMPTY_SECTION.len()..(i + 1) * EMPTY_SECTION.len()],
                EMPTY_SECTION,
                "section {}",
                i
            );
        }
        assert_eq!(&chunk_body[24 * EMPTY_SECTION.len()..], &[0; 5]);
    }

    #[test]
    fn scheduled_tick_layout() {
        let mut world = World::new(0, 0);
        let mut chunk = Chunk::new(0, 0, 0);
        chunk.scheduled_ticks.push(ScheduledTick {
            packed_xz: pack_xz(3, 7),
            y: 64,
            block: "a".to_string(),
            tick: -1,
        });
        world.set_chunk(chunk);

        let bytes = encoded(&world);
        // head (10) + coords (8) + no sections + bec 0 + ec 0
        let tail = &bytes[20..];
        assert_eq!(
            tail,
            &[
                0x02, // one tick
                0x73, // packed xz: x=3, z=7
                0x00, 0x00, 0x00, 0x40, // y = 64
                0x02, b'a', // block id
                0x01, // tick = -1, zigzag
                0x00, 0x00, // heightmaps, user data
            ]
        );
    }
}
