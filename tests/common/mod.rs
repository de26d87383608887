//! Shared helpers for provider integration tests.

use pile::{BlockEntity, Chunk, Entity, Provider, ScheduledTick};
use std::path::Path;
use uuid::Uuid;

/// A chunk with one populated section and one of every payload kind.
pub fn sample_chunk(x: i32, z: i32, section_count: usize) -> Chunk {
    let mut chunk = Chunk::new(x, z, section_count);
    if let Some(section) = chunk.section_mut(0) {
        section.set_block_at(0, 0, 0, "minecraft:stone");
        section.set_block_at(7, 15, 3, "minecraft:diamond_ore");
        section.set_biome_at(0, 0, 0, "minecraft:desert");
    }

    chunk.block_entities.push(BlockEntity {
        packed_xz: pile::pack_xz(4, 11),
        y: -40,
        id: "minecraft:chest".to_string(),
        data: vec![0x0A, 0x00, 0x00, 0x00],
    });
    chunk.entities.push(Entity {
        uuid: Uuid::new_v4(),
        id: "minecraft:creeper".to_string(),
        position: [x as f32 * 16.0, -50.0, z as f32 * 16.0],
        rotation: [180.0, 0.0],
        velocity: [0.0, -0.08, 0.0],
        data: Vec::new(),
    });
    chunk.scheduled_ticks.push(ScheduledTick {
        packed_xz: pile::pack_xz(0, 0),
        y: -30,
        block: "minecraft:lava".to_string(),
        tick: 77,
    });
    chunk
}

/// Builds a provider in `dir`, stores a few chunks across dimensions, saves
/// and closes it.
pub fn write_populated_world(dir: &Path) {
    let provider = Provider::new(dir).unwrap();
    for x in 0..3 {
        provider
            .store_column(pile::Dimension::Overworld, sample_chunk(x, 0, 24))
            .unwrap();
    }
    provider
        .store_column(pile::Dimension::Nether, sample_chunk(0, 0, 8))
        .unwrap();
    provider.close().unwrap();
}
