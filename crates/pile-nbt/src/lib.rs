//! Named Binary Tag codec.
//!
//! Pile stores chunk-level NBT blobs as opaque bytes; this crate is the codec
//! used where the provider itself has to look inside such a blob, most notably
//! for the world settings compound embedded in the overworld's user data.
//! Compounds are kept in a `BTreeMap` so that encoding a tag tree is
//! deterministic.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

/// A single NBT tag. Named tags on the wire are `(u8 type id, u16-prefixed
/// name, payload)`; list elements are bare payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(BTreeMap<String, Tag>),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads one named tag. Returns the empty name for `Tag::End`.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }
        let name = read_name(reader)?;
        let tag = Tag::read_payload(reader, type_id)?;
        Ok((name, tag))
    }

    fn read_payload<R: Read>(reader: &mut R, type_id: u8) -> io::Result<Tag> {
        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            7 => {
                let len = read_array_len(reader)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(reader.read_i8()?);
                }
                Ok(Tag::ByteArray(values))
            }
            8 => {
                let mut bytes = vec![0u8; reader.read_u16::<BigEndian>()? as usize];
                reader.read_exact(&mut bytes)?;
                String::from_utf8(bytes)
                    .map(Tag::String)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            }
            9 => {
                let element_type = reader.read_u8()?;
                let len = read_array_len(reader)?;
                let mut elements = Vec::with_capacity(len);
                for _ in 0..len {
                    elements.push(Tag::read_payload(reader, element_type)?);
                }
                Ok(Tag::List(elements))
            }
            10 => {
                let mut entries = BTreeMap::new();
                loop {
                    let (name, tag) = Tag::read(reader)?;
                    if tag == Tag::End {
                        break;
                    }
                    entries.insert(name, tag);
                }
                Ok(Tag::Compound(entries))
            }
            11 => {
                let len = read_array_len(reader)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(reader.read_i32::<BigEndian>()?);
                }
                Ok(Tag::IntArray(values))
            }
            12 => {
                let len = read_array_len(reader)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(reader.read_i64::<BigEndian>()?);
                }
                Ok(Tag::LongArray(values))
            }
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown tag type: {}", other),
            )),
        }
    }

    /// Writes this tag with the given name.
    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.type_id())?;
        if *self != Tag::End {
            write_name(writer, name)?;
        }
        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                for v in values {
                    writer.write_i8(*v)?;
                }
                Ok(())
            }
            Tag::String(v) => {
                writer.write_u16::<BigEndian>(v.len() as u16)?;
                writer.write_all(v.as_bytes())
            }
            Tag::List(elements) => {
                let element_type = elements.first().map_or(0, Tag::type_id);
                writer.write_u8(element_type)?;
                writer.write_i32::<BigEndian>(elements.len() as i32)?;
                for element in elements {
                    element.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(entries) => {
                for (name, tag) in entries {
                    tag.write(writer, name)?;
                }
                writer.write_u8(0)
            }
            Tag::IntArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                for v in values {
                    writer.write_i32::<BigEndian>(*v)?;
                }
                Ok(())
            }
            Tag::LongArray(values) => {
                writer.write_i32::<BigEndian>(values.len() as i32)?;
                for v in values {
                    writer.write_i64::<BigEndian>(*v)?;
                }
                Ok(())
            }
        }
    }

    /// Looks up a child of a compound tag. Returns `None` for non-compounds.
    pub fn get(&self, name: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(entries) => entries.get(name),
            _ => None,
        }
    }

    pub fn as_compound(&self) -> Option<&BTreeMap<String, Tag>> {
        match self {
            Tag::Compound(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Tag::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Tag::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Tag::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Tag::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean convenience: NBT has no bool type, a byte tag is used instead.
    pub fn as_bool(&self) -> Option<bool> {
        self.as_i8().map(|v| v != 0)
    }
}

fn read_name<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut bytes = vec![0u8; reader.read_u16::<BigEndian>()? as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> io::Result<()> {
    writer.write_u16::<BigEndian>(name.len() as u16)?;
    writer.write_all(name.as_bytes())
}

fn read_array_len<R: Read>(reader: &mut R) -> io::Result<usize> {
    let len = reader.read_i32::<BigEndian>()?;
    if len < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("negative array length: {}", len),
        ));
    }
    Ok(len as usize)
}

/// A root tag together with its name, as stored on disk.
pub struct NbtFile {
    pub name: String,
    pub root: Tag,
}

impl NbtFile {
    pub fn new(name: impl Into<String>, root: Tag) -> Self {
        NbtFile {
            name: name.into(),
            root,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let (name, root) = Tag::read(reader)?;
        Ok(NbtFile { name, root })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        Self::read(&mut decoder)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_compound() -> Tag {
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Tag::String("Pile World".to_string()));
        entries.insert("time".to_string(), Tag::Long(6000));
        entries.insert("raining".to_string(), Tag::Byte(0));
        entries.insert(
            "spawn".to_string(),
            Tag::List(vec![Tag::Int(0), Tag::Int(64), Tag::Int(0)]),
        );
        Tag::Compound(entries)
    }

    #[test]
    fn scalar_round_trips() {
        let cases = vec![
            (Tag::Byte(-7), "byte"),
            (Tag::Short(1234), "short"),
            (Tag::Int(-123456), "int"),
            (Tag::Long(1 << 40), "long"),
            (Tag::Float(0.5), "float"),
            (Tag::Double(-2.25), "double"),
            (Tag::String("hello".to_string()), "string"),
            (Tag::ByteArray(vec![1, -2, 3]), "bytes"),
            (Tag::IntArray(vec![10, 20]), "ints"),
            (Tag::LongArray(vec![-1, 0, 1]), "longs"),
            (Tag::List(vec![Tag::Short(1), Tag::Short(2)]), "list"),
        ];

        for (tag, name) in cases {
            let mut buf = Vec::new();
            tag.write(&mut buf, name).unwrap();
            let (read_name, read_tag) = Tag::read(&mut Cursor::new(buf)).unwrap();
            assert_eq!(read_name, name);
            assert_eq!(read_tag, tag);
        }
    }

    #[test]
    fn compound_round_trip_and_lookup() {
        let tag = sample_compound();
        let mut buf = Vec::new();
        tag.write(&mut buf, "settings").unwrap();

        let (name, read) = Tag::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(name, "settings");
        assert_eq!(read, tag);
        assert_eq!(read.get("name").and_then(Tag::as_str), Some("Pile World"));
        assert_eq!(read.get("time").and_then(Tag::as_i64), Some(6000));
        assert_eq!(read.get("raining").and_then(Tag::as_bool), Some(false));
        assert!(read.get("missing").is_none());
    }

    #[test]
    fn compound_encoding_is_deterministic() {
        let tag = sample_compound();
        let mut a = Vec::new();
        let mut b = Vec::new();
        tag.write(&mut a, "").unwrap();
        tag.write(&mut b, "").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_list_uses_end_element_type() {
        let tag = Tag::List(Vec::new());
        let mut buf = Vec::new();
        tag.write(&mut buf, "empty").unwrap();
        // type id, name length, name, element type (End), length 0
        assert_eq!(buf, vec![9, 0, 5, b'e', b'm', b'p', b't', b'y', 0, 0, 0, 0, 0]);

        let (_, read) = Tag::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read, tag);
    }

    #[test]
    fn rejects_unknown_tag_type() {
        let bytes = vec![42u8, 0, 0];
        assert!(Tag::read(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn gzip_file_round_trip() {
        let file = NbtFile::new("root", sample_compound());

        let mut plain = Vec::new();
        file.write(&mut plain).unwrap();
        let reread = NbtFile::read(&mut Cursor::new(plain)).unwrap();
        assert_eq!(reread.name, file.name);
        assert_eq!(reread.root, file.root);

        let mut packed = Vec::new();
        file.write_gzip(&mut packed).unwrap();
        let reread = NbtFile::read_gzip(&mut Cursor::new(packed)).unwrap();
        assert_eq!(reread.name, file.name);
        assert_eq!(reread.root, file.root);
    }
}
