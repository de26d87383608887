//! Pile world storage.
//!
//! A Pile provider keeps an entire small world in memory — overworld, nether
//! and end — and persists each dimension as a single optionally
//! Zstandard-compressed file. The wire format, palette machinery and world
//! model live in [`pile_format`]; this crate adds the thread-safe provider,
//! the settings codec and the seams a host engine plugs into.
//!
//! ```no_run
//! use pile::{CompressionLevel, Provider};
//!
//! # fn main() -> pile::Result<()> {
//! let provider = Provider::new_with_compression("world", CompressionLevel::Best)?;
//! let mut settings = provider.settings();
//! settings.name = "My World".to_string();
//! provider.save_settings(settings);
//! provider.close()?;
//! # Ok(())
//! # }
//! ```

pub mod convert;
pub mod dimension;
pub mod provider;
pub mod settings;

pub use convert::{BiomeRegistry, BlockRegistry, ColumnConverter, CompoundView, NbtView};
pub use dimension::Dimension;
pub use provider::{BlockPos, Provider};
pub use settings::Settings;

// The format layer's surface, re-exported for hosts that only pull in `pile`.
pub use pile_format::{
    pack_xz, read, write, write_streaming, write_with_compression, BlockEntity, Chunk,
    CompressionLevel, Entity, PileError, Result, ScheduledTick, Section, World,
};
