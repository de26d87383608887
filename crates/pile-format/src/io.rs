//! File framing: header, optional Zstandard body, bulk and streaming writers.
//!
//! The header is never compressed. Its trailing `data_length` varint is
//! advisory only — the bulk writer records the uncompressed payload size, the
//! streaming writer records 0 — and readers consume the body to EOF instead.

use crate::binary::{PileReader, PileWriter};
use crate::decode::decode_world;
use crate::encode::encode_world;
use crate::error::{PileError, Result};
use crate::world::{World, CURRENT_VERSION};
use std::io::{Read, Write};

/// "Pile", big-endian.
pub const MAGIC: u32 = 0x5069_6C65;

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_ZSTD: u8 = 1;

/// Payloads at or below this size are written raw regardless of the
/// requested level; compression overhead would dominate.
const COMPRESS_THRESHOLD: usize = 1024;

/// Compression effort for saving worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionLevel {
    /// No compression.
    None,
    /// Fastest Zstandard level.
    Fast,
    /// Balanced Zstandard level.
    Default,
    /// Strongest Zstandard level.
    Best,
}

impl CompressionLevel {
    fn zstd_level(self) -> i32 {
        match self {
            CompressionLevel::None => 0,
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 3,
            CompressionLevel::Best => 19,
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        CompressionLevel::Default
    }
}

/// Reads a Pile world. Accepts any valid Zstandard body regardless of the
/// level it was written at.
pub fn read<R: Read>(mut input: R) -> Result<World> {
    let compression = {
        let mut header = PileReader::new(&mut input);
        let magic = header.read_u32()?;
        if magic != MAGIC {
            return Err(PileError::InvalidMagic { got: magic });
        }
        let version = header.read_i16()?;
        if version > CURRENT_VERSION {
            return Err(PileError::UnsupportedVersion(version));
        }
        let compression = header.read_u8()?;
        header.read_varint()?; // advisory data length, ignored
        compression
    };

    if compression == COMPRESSION_ZSTD {
        let decoder =
            zstd::Decoder::new(input).map_err(|e| PileError::Compression(e.to_string()))?;
        decode_world(&mut PileReader::new(decoder))
    } else {
        decode_world(&mut PileReader::new(input))
    }
}

/// Writes a world at the default compression level.
pub fn write<W: Write>(out: W, world: &World) -> Result<()> {
    write_with_compression(out, world, CompressionLevel::Default)
}

/// Buffers the whole payload, compresses it when that is worthwhile, then
/// writes header and body.
pub fn write_with_compression<W: Write>(
    mut out: W,
    world: &World,
    level: CompressionLevel,
) -> Result<()> {
    let mut payload = PileWriter::new(Vec::new());
    encode_world(&mut payload, world)?;
    let payload = payload.into_inner();

    let mut compressed = None;
    if level != CompressionLevel::None && payload.len() > COMPRESS_THRESHOLD {
        let packed = zstd::encode_all(&payload[..], level.zstd_level())
            .map_err(|e| PileError::Compression(e.to_string()))?;
        // Keep the compressed form only when it actually pays off.
        if packed.len() < payload.len() {
            compressed = Some(packed);
        }
    }

    let compression = if compressed.is_some() {
        COMPRESSION_ZSTD
    } else {
        COMPRESSION_NONE
    };
    write_header(&mut out, compression, payload.len() as i64)?;
    out.write_all(compressed.as_deref().unwrap_or(&payload))?;
    Ok(())
}

/// Streams the payload chunk-by-chunk instead of buffering it, bounding peak
/// memory at roughly one chunk.
pub fn write_streaming<W: Write>(mut out: W, world: &World, level: CompressionLevel) -> Result<()> {
    if level == CompressionLevel::None {
        write_header(&mut out, COMPRESSION_NONE, 0)?;
        let mut body = PileWriter::new(&mut out);
        return encode_world(&mut body, world);
    }

    // The encoder wraps the sink before the header is written, but the header
    // must not pass through it: it is emitted to the raw sink and only the
    // payload is compressed.
    let mut encoder = zstd::Encoder::new(out, level.zstd_level())
        .map_err(|e| PileError::Compression(e.to_string()))?;
    write_header(encoder.get_mut(), COMPRESSION_ZSTD, 0)?;

    let mut body = PileWriter::new(&mut encoder);
    encode_world(&mut body, world)?;

    encoder
        .finish()
        .map_err(|e| PileError::Compression(e.to_string()))?;
    Ok(())
}

fn write_header<W: Write>(out: &mut W, compression: u8, data_length: i64) -> Result<()> {
    let mut header = PileWriter::new(out);
    header.write_u32(MAGIC)?;
    header.write_i16(CURRENT_VERSION)?;
    header.write_u8(compression)?;
    header.write_varint(data_length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Chunk;
    use std::io::Cursor;

    fn world_with_chunks(count: i32) -> World {
        let mut world = World::new(-4, 20);
        for x in 0..count {
            let mut chunk = Chunk::new(x, -x, world.section_count());
            let section = chunk.section_mut(2).unwrap();
            section.set_block_at(0, 0, 0, "minecraft:stone");
            section.set_block_at(1, 0, 0, "minecraft:dirt");
            world.set_chunk(chunk);
        }
        world
    }

    #[test]
    fn empty_world_file_bytes() {
        let mut file = Vec::new();
        write_with_compression(&mut file, &World::new(-4, 20), CompressionLevel::None).unwrap();
        assert_eq!(
            file,
            &[
                0x50, 0x69, 0x6C, 0x65, // magic "Pile"
                0x00, 0x01, // version 1
                0x00, // no compression
                0x14, // advisory payload length 10, zigzag
                0xFF, 0xFF, 0xFF, 0xFC, // min section -4
                0x00, 0x00, 0x00, 0x14, // max section 20
                0x00, 0x00, // user data, chunk count
            ]
        );

        let world = read(Cursor::new(file)).unwrap();
        assert_eq!(world.min_section(), -4);
        assert_eq!(world.max_section(), 20);
        assert_eq!(world.chunk_count(), 0);
        assert!(world.user_data.is_empty());
    }

    #[test]
    fn rejects_wrong_magic() {
        let file = vec![0x50, 0x69, 0x6C, 0x00, 0x00, 0x01, 0x00, 0x00];
        assert!(matches!(
            read(Cursor::new(file)),
            Err(PileError::InvalidMagic { got: 0x50696C00 })
        ));
    }

    #[test]
    fn rejects_future_version() {
        let file = vec![0x50, 0x69, 0x6C, 0x65, 0x00, 0x02, 0x00, 0x00];
        assert!(matches!(
            read(Cursor::new(file)),
            Err(PileError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn advisory_data_length_is_ignored() {
        let mut file = Vec::new();
        write_with_compression(&mut file, &World::new(0, 1), CompressionLevel::None).unwrap();
        // Corrupt the advisory length; the payload is untouched.
        file[7] = 0x7E;
        let world = read(Cursor::new(file)).unwrap();
        assert_eq!(world.section_count(), 1);
    }

    #[test]
    fn small_payload_is_never_compressed() {
        let mut file = Vec::new();
        write_with_compression(&mut file, &World::new(-4, 20), CompressionLevel::Best).unwrap();
        assert_eq!(file[6], COMPRESSION_NONE);
    }

    #[test]
    fn large_payload_compresses_and_reads_back() {
        let world = world_with_chunks(10);
        let mut file = Vec::new();
        write_with_compression(&mut file, &world, CompressionLevel::Best).unwrap();
        assert_eq!(&file[..7], &[0x50, 0x69, 0x6C, 0x65, 0x00, 0x01, 0x01]);

        let mut decoded = read(Cursor::new(file)).unwrap();
        let mut original = world;
        original.clear_dirty();
        decoded.clear_dirty();
        assert_eq!(decoded, original);
    }

    #[test]
    fn every_level_reads_back_identically() {
        let mut original = world_with_chunks(6);
        original.clear_dirty();

        let mut plain = Vec::new();
        write_with_compression(&mut plain, &original, CompressionLevel::None).unwrap();
        let baseline = read(Cursor::new(plain)).unwrap();
        assert_eq!(baseline, original);

        for level in [
            CompressionLevel::Fast,
            CompressionLevel::Default,
            CompressionLevel::Best,
        ] {
            let mut file = Vec::new();
            write_with_compression(&mut file, &original, level).unwrap();
            assert_eq!(read(Cursor::new(file)).unwrap(), baseline, "{:?}", level);
        }
    }

    #[test]
    fn streaming_writer_matches_bulk_semantics() {
        let mut original = world_with_chunks(6);
        original.clear_dirty();

        for level in [
            CompressionLevel::None,
            CompressionLevel::Fast,
            CompressionLevel::Best,
        ] {
            let mut file = Vec::new();
            write_streaming(&mut file, &original, level).unwrap();
            assert_eq!(read(Cursor::new(file)).unwrap(), original, "{:?}", level);
        }
    }

    #[test]
    fn streaming_header_stays_outside_the_compressed_stream() {
        let mut file = Vec::new();
        write_streaming(&mut file, &world_with_chunks(2), CompressionLevel::Best).unwrap();

        // Header readable as plain bytes: magic, version, zstd marker, then
        // the zero-length placeholder.
        assert_eq!(
            &file[..8],
            &[0x50, 0x69, 0x6C, 0x65, 0x00, 0x01, 0x01, 0x00]
        );
        // Immediately after: a Zstandard frame header (little-endian magic).
        assert_eq!(&file[8..12], &[0x28, 0xB5, 0x2F, 0xFD]);
    }

    #[test]
    fn streaming_writer_always_marks_zstd_for_compressed_levels() {
        // Unlike the bulk writer there is no size cut-off: the mode is chosen
        // up front because the payload size is unknown.
        let mut file = Vec::new();
        write_streaming(&mut file, &World::new(-4, 20), CompressionLevel::Default).unwrap();
        assert_eq!(file[6], COMPRESSION_ZSTD);
        assert_eq!(read(Cursor::new(file)).unwrap(), World::new(-4, 20));
    }

    #[test]
    fn unknown_compression_byte_reads_as_raw() {
        let mut file = Vec::new();
        write_with_compression(&mut file, &World::new(0, 1), CompressionLevel::None).unwrap();
        file[6] = 7;
        assert!(read(Cursor::new(file)).is_ok());
    }
}
