//! Records and their stored encoding.
//!
//! A record's value is a CBOR map with the file's name, media type, write
//! time, size and raw content. The id is not part of the value; it is the
//! engine key the value is stored under.

use crate::engine::{EngineError, EngineResult, Key};
use serde::{Deserialize, Serialize};

/// A file to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    /// File name. Need not be unique.
    pub name: String,
    /// Raw content.
    pub content: Vec<u8>,
    /// Media type hint such as `video/mp4`.
    pub media_type: Option<String>,
    /// Size as reported by the caller.
    pub size: u64,
}

impl NewFile {
    /// A file without media type whose size is the content length.
    #[must_use]
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        let size = content.len() as u64;
        Self {
            name: name.into(),
            content,
            media_type: None,
            size,
        }
    }

    /// Sets the media type. An empty string means none.
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        self.media_type = (!media_type.is_empty()).then_some(media_type);
        self
    }

    /// Overrides the reported size.
    ///
    /// The size is stored as given and never checked against the content.
    #[must_use]
    pub const fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }
}

/// A stored file as listed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Key assigned on insert. Ascending in insertion order.
    pub id: Key,
    /// File name.
    pub name: String,
    /// Media type hint, if one was given.
    pub media_type: Option<String>,
    /// Milliseconds since the Unix epoch at which the batch was written.
    pub last_modified: i64,
    /// Size as reported when stored.
    pub size: u64,
    /// Raw content.
    pub content: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct StoredFile {
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    media_type: Option<String>,
    #[serde(rename = "lastModified")]
    last_modified: i64,
    size: u64,
    #[serde(with = "serde_bytes")]
    content: Vec<u8>,
}

/// Encodes `file` as a stored value stamped with `last_modified`.
pub(crate) fn encode(file: NewFile, last_modified: i64) -> EngineResult<Vec<u8>> {
    let stored = StoredFile {
        name: file.name,
        media_type: file.media_type,
        last_modified,
        size: file.size,
        content: file.content,
    };
    let mut bytes = Vec::with_capacity(stored.content.len() + stored.name.len() + 64);
    ciborium::into_writer(&stored, &mut bytes).map_err(|e| EngineError::codec(e.to_string()))?;
    Ok(bytes)
}

/// Decodes the value stored under `id`.
pub(crate) fn decode(id: Key, value: &[u8]) -> EngineResult<Record> {
    let stored: StoredFile = ciborium::from_reader(value)
        .map_err(|e| EngineError::codec(format!("record {id}: {e}")))?;
    Ok(Record {
        id,
        name: stored.name,
        media_type: stored.media_type,
        last_modified: stored.last_modified,
        size: stored.size,
        content: stored.content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_defaults() {
        let file = NewFile::new("a.txt", b"hello".to_vec());
        assert_eq!(file.size, 5);
        assert_eq!(file.media_type, None);
    }

    #[test]
    fn empty_media_type_is_none() {
        let file = NewFile::new("a", Vec::new()).media_type("");
        assert_eq!(file.media_type, None);
        let file = file.media_type("text/plain");
        assert_eq!(file.media_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn size_is_not_validated() {
        let file = NewFile::new("a", b"xy".to_vec()).size(1000);
        let record = decode(4, &encode(file, 10).unwrap()).unwrap();
        assert_eq!(record.size, 1000);
        assert_eq!(record.content, b"xy");
    }

    #[test]
    fn decoded_record_carries_key_and_fields() {
        let file = NewFile::new("clip.mp4", vec![0, 1, 2, 255]).media_type("video/mp4");
        let record = decode(9, &encode(file, 1_700_000_000_000).unwrap()).unwrap();
        assert_eq!(
            record,
            Record {
                id: 9,
                name: "clip.mp4".into(),
                media_type: Some("video/mp4".into()),
                last_modified: 1_700_000_000_000,
                size: 4,
                content: vec![0, 1, 2, 255],
            }
        );
    }

    #[test]
    fn value_uses_wire_field_names() {
        let bytes = encode(NewFile::new("n", Vec::new()).media_type("a/b"), 1).unwrap();
        let value: ciborium::Value = ciborium::from_reader(bytes.as_slice()).unwrap();
        let keys: Vec<String> = value
            .as_map()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_text().unwrap().to_owned())
            .collect();
        assert_eq!(keys, ["name", "type", "lastModified", "size", "content"]);
    }

    #[test]
    fn missing_media_type_decodes_as_none() {
        let bytes = encode(NewFile::new("n", Vec::new()), 1).unwrap();
        assert_eq!(decode(1, &bytes).unwrap().media_type, None);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        let err = decode(1, &[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, EngineError::Codec(_)));
    }
}
