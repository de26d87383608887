//! The Pile world format.
//!
//! Pile stores an entire dimension in a single file: a short uncompressed
//! header followed by an optionally Zstandard-compressed payload of chunks.
//! Sections inside a chunk keep blocks and biomes as paletted, bit-packed
//! index arrays, which keeps small worlds compact enough to hold in memory
//! and rewrite wholesale on every save.
//!
//! This crate covers the data model, the wire codec and the file framing.
//! The multi-dimension provider that manages three of these worlds lives in
//! the `pile` crate.

pub mod binary;
pub mod decode;
pub mod encode;
pub mod error;
pub mod io;
pub mod palette;
pub mod world;

pub use error::{PileError, Result};
pub use io::{read, write, write_streaming, write_with_compression, CompressionLevel};
pub use palette::{bits_per_entry, pack_indices, unpack_indices, PalettedStore};
pub use world::{
    block_index, chunk_key, pack_xz, BlockEntity, Chunk, Entity, ScheduledTick, Section, World,
    AIR, CURRENT_VERSION, PLAINS, SECTION_VOLUME,
};
