//! Binary envelope for stored documents.
//!
//! Layout: `[format: u8][version: u64 LE][crc32: u32 LE][json payload]`.
//! The checksum covers the payload only.

use super::error::KvError;
use super::types::{Document, Entry, StoredEntry};

const HEADER_LEN: usize = 1 + 8 + 4;

impl StoredEntry {
    /// Encode the envelope to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.push(self.format);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&self.payload).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decode an envelope, verifying format and checksum.
    ///
    /// `key` is only used for error reporting.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, KvError> {
        let corrupted = |reason: String| KvError::Corrupted {
            key: key.to_string(),
            reason,
        };

        let (header, payload) = bytes
            .split_at_checked(HEADER_LEN)
            .ok_or_else(|| corrupted(format!("{} byte value is shorter than header", bytes.len())))?;
        let (format, rest) = header
            .split_first()
            .ok_or_else(|| corrupted("empty header".to_string()))?;
        if *format != Self::CURRENT_FORMAT {
            return Err(corrupted(format!("unknown format {}", format)));
        }

        let (version_bytes, crc_bytes) = rest.split_at(8);
        let version = u64::from_le_bytes(
            version_bytes
                .try_into()
                .map_err(|_| corrupted("bad version field".to_string()))?,
        );
        let crc = u32::from_le_bytes(
            crc_bytes
                .try_into()
                .map_err(|_| corrupted("bad checksum field".to_string()))?,
        );

        let actual = crc32fast::hash(payload);
        if actual != crc {
            return Err(corrupted(format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                crc, actual
            )));
        }

        Ok(Self {
            format: *format,
            version,
            payload: payload.to_vec(),
        })
    }

    /// Parse the JSON payload.
    pub fn document(&self, key: &str) -> Result<Document, KvError> {
        serde_json::from_slice(&self.payload).map_err(|e| KvError::Corrupted {
            key: key.to_string(),
            reason: format!("invalid JSON payload: {}", e),
        })
    }

    /// Convert into a reader-facing [`Entry`].
    pub fn into_entry(self, key: String) -> Result<Entry, KvError> {
        let value = self.document(&key)?;
        Ok(Entry {
            key,
            value,
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_roundtrip() {
        let stored = StoredEntry::new(3, &json!({"name": "OOP", "credits": 4})).unwrap();
        let bytes = stored.encode();
        let decoded = StoredEntry::decode("subject:1", &bytes).unwrap();
        assert_eq!(decoded, stored);
        assert_eq!(decoded.version, 3);
        assert_eq!(
            decoded.document("subject:1").unwrap(),
            json!({"name": "OOP", "credits": 4})
        );
    }

    #[test]
    fn test_detects_flipped_payload_byte() {
        let mut bytes = StoredEntry::new(1, &json!({"name": "A"})).unwrap().encode();
        if let Some(last) = bytes.last_mut() {
            *last ^= 0xff;
        }
        let err = StoredEntry::decode("k", &bytes).unwrap_err();
        assert!(matches!(err, KvError::Corrupted { ref key, .. } if key == "k"));
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_rejects_truncated_value() {
        let err = StoredEntry::decode("k", &[1, 0, 0]).unwrap_err();
        assert!(err.to_string().contains("shorter than header"));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let mut bytes = StoredEntry::new(1, &json!(null)).unwrap().encode();
        if let Some(first) = bytes.first_mut() {
            *first = 9;
        }
        let err = StoredEntry::decode("k", &bytes).unwrap_err();
        assert!(err.to_string().contains("unknown format 9"));
    }

    #[test]
    fn test_invalid_json_is_corruption() {
        let stored = StoredEntry {
            format: StoredEntry::CURRENT_FORMAT,
            version: 1,
            payload: b"{not json".to_vec(),
        };
        let decoded = StoredEntry::decode("k", &stored.encode()).unwrap();
        assert!(matches!(
            decoded.document("k"),
            Err(KvError::Corrupted { .. })
        ));
    }
}
