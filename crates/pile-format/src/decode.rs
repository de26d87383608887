//! World payload deserialization.

use crate::binary::PileReader;
use crate::error::{PileError, Result};
use crate::palette::PalettedStore;
use crate::world::{BlockEntity, Chunk, Entity, ScheduledTick, Section, World, SECTION_VOLUME};
use std::io::Read;
use uuid::Uuid;

/// Hard upper bound on the chunk count field; anything larger is treated as a
/// corrupt stream rather than an allocation request.
pub const MAX_CHUNK_COUNT: i64 = 1_000_000;

pub fn decode_world<R: Read>(input: &mut PileReader<R>) -> Result<World> {
    let min_section = input.read_i32()?;
    let max_section = input.read_i32()?;

    let mut world = World::new(min_section, max_section);
    world.user_data = input.read_bytes()?;

    let chunk_count = input.read_varint()?;
    if !(0..=MAX_CHUNK_COUNT).contains(&chunk_count) {
        return Err(PileError::InvalidLength(format!(
            "chunk count {} out of range",
            chunk_count
        )));
    }

    let section_count = world.section_count();
    for _ in 0..chunk_count {
        let chunk = decode_chunk(input, section_count)?;
        world.set_chunk(chunk);
    }

    // A freshly decoded world has no unsaved changes.
    world.clear_dirty();
    Ok(world)
}

fn decode_chunk<R: Read>(input: &mut PileReader<R>, section_count: usize) -> Result<Chunk> {
    let x = input.read_i32()?;
    let z = input.read_i32()?;
    let mut chunk = Chunk::new(x, z, section_count);

    for i in 0..section_count {
        let section = decode_section(input)?;
        // Empty sections are elided in memory; the encoder pads them back.
        if !section.is_empty() {
            chunk.sections[i] = Some(section);
        }
    }

    let block_entity_count = read_count(input, "block entity")?;
    chunk.block_entities.reserve(block_entity_count.min(1024));
    for _ in 0..block_entity_count {
        chunk.block_entities.push(decode_block_entity(input)?);
    }

    let entity_count = read_count(input, "entity")?;
    chunk.entities.reserve(entity_count.min(1024));
    for _ in 0..entity_count {
        chunk.entities.push(decode_entity(input)?);
    }

    let tick_count = read_count(input, "scheduled tick")?;
    chunk.scheduled_ticks.reserve(tick_count.min(1024));
    for _ in 0..tick_count {
        chunk.scheduled_ticks.push(ScheduledTick {
            packed_xz: input.read_u8()?,
            y: input.read_i32()?,
            block: input.read_string()?,
            tick: input.read_varint()?,
        });
    }

    chunk.heightmaps = input.read_bytes()?;
    chunk.user_data = input.read_bytes()?;
    Ok(chunk)
}

fn decode_section<R: Read>(input: &mut PileReader<R>) -> Result<Section> {
    let blocks = decode_store(input, "block")?;
    let biomes = decode_store(input, "biome")?;
    Ok(Section::from_parts(blocks, biomes))
}

fn decode_store<R: Read>(input: &mut PileReader<R>, what: &str) -> Result<PalettedStore> {
    let palette_len = read_count(input, what)?;
    let mut palette = Vec::with_capacity(palette_len.min(SECTION_VOLUME));
    for _ in 0..palette_len {
        palette.push(input.read_string()?);
    }

    let word_len = read_count(input, what)?;
    let mut data = Vec::with_capacity(word_len.min(SECTION_VOLUME));
    for _ in 0..word_len {
        data.push(input.read_i64()?);
    }

    Ok(PalettedStore::from_parts(SECTION_VOLUME, palette, data))
}

fn decode_block_entity<R: Read>(input: &mut PileReader<R>) -> Result<BlockEntity> {
    Ok(BlockEntity {
        packed_xz: input.read_u8()?,
        y: input.read_i32()?,
        id: input.read_string()?,
        data: input.read_bytes()?,
    })
}

fn decode_entity<R: Read>(input: &mut PileReader<R>) -> Result<Entity> {
    let id = input.read_string()?;
    let uuid_text = input.read_string()?;
    // A garbled UUID is not worth losing the entity over; fall back to nil.
    let uuid = Uuid::parse_str(&uuid_text).unwrap_or(Uuid::nil());

    let mut position = [0f32; 3];
    for v in &mut position {
        *v = input.read_f32()?;
    }
    let mut rotation = [0f32; 2];
    for v in &mut rotation {
        *v = input.read_f32()?;
    }
    let mut velocity = [0f32; 3];
    for v in &mut velocity {
        *v = input.read_f32()?;
    }

    Ok(Entity {
        uuid,
        id,
        position,
        rotation,
        velocity,
        data: input.read_bytes()?,
    })
}

fn read_count<R: Read>(input: &mut PileReader<R>, what: &str) -> Result<usize> {
    let count = input.read_varint()?;
    if count < 0 {
        return Err(PileError::InvalidLength(format!(
            "negative {} count: {}",
            what, count
        )));
    }
    Ok(count as usize)
}
