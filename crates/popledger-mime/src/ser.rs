//! JSON-friendly serialization of decoded messages.
//!
//! Every node becomes one flat map: its headers (first occurrence per name)
//! followed by `"Body"` for containers or `"data"` for leaves.

use crate::header::Headers;
use crate::message::{BodyPart, ParsedMessage, Payload};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::{Serialize, SerializeMap, Serializer};

const BODY_KEY: &str = "Body";
const DATA_KEY: &str = "data";

fn is_structural(name: &str) -> bool {
    name.eq_ignore_ascii_case(BODY_KEY) || name.eq_ignore_ascii_case(DATA_KEY)
}

fn serialize_node<S, V>(headers: &Headers, key: &str, value: &V, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(None)?;
    for (name, header_value) in headers.first_of_each().filter(|(name, _)| !is_structural(name)) {
        map.serialize_entry(name, header_value)?;
    }
    map.serialize_entry(key, value)?;
    map.end()
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Binary(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        }
    }
}

impl Serialize for BodyPart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf { headers, data } => serialize_node(headers, DATA_KEY, data, serializer),
            Self::Container { headers, parts } => {
                serialize_node(headers, BODY_KEY, parts.as_slice(), serializer)
            }
        }
    }
}

impl Serialize for ParsedMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_node(&self.headers, BODY_KEY, self.body.as_slice(), serializer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::parse;
    use serde_json::{Value, json};

    #[test]
    fn test_single_part_shape() {
        let message = parse(b"From: a@x\r\nTo: b@y\r\nSubject: hi\r\n\r\nhello");
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(
            value,
            json!({
                "From": "a@x",
                "To": "b@y",
                "Subject": "hi",
                "Body": [{
                    "From": "a@x",
                    "To": "b@y",
                    "Subject": "hi",
                    "data": "hello"
                }]
            })
        );
    }

    #[test]
    fn test_multipart_shape_and_binary() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "hi\r\n",
            "--b\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAEC\r\n",
            "--b--\r\n",
        );
        let value = serde_json::to_value(parse(raw.as_bytes())).unwrap();

        let body = value["Body"].as_array().unwrap();
        assert_eq!(body.len(), 2);
        assert_eq!(body[0]["data"], "hi");
        assert_eq!(body[1]["data"], "AAEC");
        assert_eq!(body[1]["Content-Type"], "application/octet-stream");
    }

    #[test]
    fn test_first_header_occurrence_wins() {
        let value =
            serde_json::to_value(parse(b"Received: one\r\nReceived: two\r\n\r\nx")).unwrap();
        assert_eq!(value["Received"], "one");
    }

    #[test]
    fn test_structural_keys_not_overwritten_by_headers() {
        let value = serde_json::to_value(parse(b"Body: spoof\r\nData: spoof\r\n\r\nreal")).unwrap();

        assert!(value["Body"].is_array());
        assert_eq!(value["Body"][0]["data"], "real");
        assert_eq!(value.get("Data"), None::<&Value>);
    }
}
