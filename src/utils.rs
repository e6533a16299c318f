use sha2::{Digest, Sha256};

/// Hex-encoded sha256 of `data`.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Decodes a hex string, tolerating an optional `0x` prefix.
pub fn decode_hex(value: &str) -> crate::Result<Vec<u8>> {
    let trimmed = value.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(stripped)?)
}

/// Serde adapter storing [`bytes::Bytes`] as a hex string.
pub mod serde_hex {
    use bytes::Bytes;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_hex(&raw).map(Bytes::from).map_err(D::Error::custom)
    }
}
