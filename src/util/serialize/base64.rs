use {
    base64::prelude::*,
    serde::{Deserialize, Deserializer, Serializer, de},
    serde_with::{DeserializeAs, SerializeAs},
};

/// Serialize and deserialize bytes as a standard base64 string, the encoding
/// used by the Flow Access REST API for scripts, arguments and signatures.
#[derive(Debug)]
pub struct Base64;

impl<'de> DeserializeAs<'de, Vec<u8>> for Base64 {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = std::borrow::Cow::<str>::deserialize(deserializer)?;
        BASE64_STANDARD.decode(s.as_bytes()).map_err(de::Error::custom)
    }
}

impl SerializeAs<Vec<u8>> for Base64 {
    fn serialize_as<S: Serializer>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(value))
    }
}
