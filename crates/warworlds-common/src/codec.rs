//! Body encoding for stored records.

use serde::{Deserialize, Serialize};

/// `native_model` body codec writing JSON.
///
/// Fields are stored by name. A reader ignores fields it does not know and
/// takes fields the writer did not know from their serde defaults, so adding
/// a field with `#[serde(default)]` never breaks old or new readers.
#[derive(Debug, Default)]
pub struct JsonCodec;

impl<T: Serialize> native_model::Encode<T> for JsonCodec {
    type Error = serde_json::Error;

    fn encode(obj: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(obj)
    }
}

impl<T: for<'de> Deserialize<'de>> native_model::Decode<T> for JsonCodec {
    type Error = serde_json::Error;

    fn decode(data: Vec<u8>) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_model::{Decode, Encode};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Narrow {
        id: i64,
        #[serde(default)]
        note: Option<String>,
    }

    #[derive(Debug, Serialize)]
    struct Wide {
        id: i64,
        note: Option<String>,
        extra: Vec<u32>,
    }

    #[test]
    fn test_unknown_fields_are_skipped() {
        let wide = Wide {
            id: 3,
            note: Some("hi".to_string()),
            extra: vec![1, 2],
        };
        let bytes = <JsonCodec as Encode<Wide>>::encode(&wide).unwrap();
        let narrow: Narrow = JsonCodec::decode(bytes).unwrap();
        assert_eq!(
            narrow,
            Narrow {
                id: 3,
                note: Some("hi".to_string())
            }
        );
    }

    #[test]
    fn test_missing_defaulted_fields_fill_in() {
        let narrow: Narrow = JsonCodec::decode(br#"{"id":7}"#.to_vec()).unwrap();
        assert_eq!(narrow.note, None);
        assert!(<JsonCodec as Decode<Narrow>>::decode(b"{}".to_vec()).is_err());
    }
}
