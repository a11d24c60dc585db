use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in source-frame pixels.
///
/// On the wire this is the `[x, y, w, h]` array the recognition
/// service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<[i32; 4]> for FaceBox {
    fn from([x, y, width, height]: [i32; 4]) -> Self {
        Self { x, y, width, height }
    }
}

impl From<FaceBox> for [i32; 4] {
    fn from(b: FaceBox) -> Self {
        [b.x, b.y, b.width, b.height]
    }
}

/// Opaque face feature vector.
///
/// The service owns the encoding format; the client only holds it
/// between an unknown-face detection and a save, and echoes it back
/// verbatim. Stored as raw JSON so format changes server-side never
/// break the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoding(pub serde_json::Value);

impl Encoding {
    /// True when the service sent nothing usable (`null` or an empty
    /// array). An empty encoding never opens an enrollment modal.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Array(v) => v.is_empty(),
            serde_json::Value::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// A stored face as reported by the recognition service.
///
/// Read-only cache material: the service is the source of truth, the
/// client refreshes this list after saves and deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub id: i64,
    pub name: String,
    /// RFC 3339 / ISO 8601 timestamp string as stored by the service.
    pub timestamp: String,
}

impl FaceRecord {
    /// Parse the stored timestamp, if it is well-formed.
    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .parse::<DateTime<Utc>>()
            .ok()
            .or_else(|| {
                // The service may store naive local timestamps.
                chrono::NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }
}

/// One sampled frame's recognition outcome.
///
/// Produced per recognize call, consumed immediately by the state
/// machine, never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameResult {
    #[serde(rename = "box")]
    pub face_box: Option<FaceBox>,
    #[serde(default)]
    pub recognized: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub encoding: Option<Encoding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_box_wire_format() {
        let b: FaceBox = serde_json::from_str("[10, 20, 50, 60]").unwrap();
        assert_eq!(b, FaceBox { x: 10, y: 20, width: 50, height: 60 });
        assert_eq!(serde_json::to_string(&b).unwrap(), "[10,20,50,60]");
    }

    #[test]
    fn test_frame_result_recognized() {
        let r: FrameResult = serde_json::from_str(
            r#"{"box":[10,10,50,50],"recognized":true,"name":"Ana"}"#,
        )
        .unwrap();
        assert!(r.recognized);
        assert_eq!(r.name.as_deref(), Some("Ana"));
        assert!(r.encoding.is_none());
        assert_eq!(r.face_box, Some(FaceBox { x: 10, y: 10, width: 50, height: 50 }));
    }

    #[test]
    fn test_frame_result_unknown_face() {
        let r: FrameResult = serde_json::from_str(
            r#"{"box":[0,0,40,40],"recognized":false,"encoding":[1.5,2.0]}"#,
        )
        .unwrap();
        assert!(!r.recognized);
        assert!(r.name.is_none());
        assert!(!r.encoding.unwrap().is_empty());
    }

    #[test]
    fn test_frame_result_null_box() {
        let r: FrameResult = serde_json::from_str(r#"{"box":null,"recognized":false}"#).unwrap();
        assert!(r.face_box.is_none());
    }

    #[test]
    fn test_encoding_emptiness() {
        assert!(Encoding(serde_json::Value::Null).is_empty());
        assert!(Encoding(serde_json::json!([])).is_empty());
        assert!(Encoding(serde_json::json!("")).is_empty());
        assert!(!Encoding(serde_json::json!([0.1, 0.2])).is_empty());
        assert!(!Encoding(serde_json::json!("E1")).is_empty());
    }

    #[test]
    fn test_face_record_timestamp_parsing() {
        let utc = FaceRecord {
            id: 1,
            name: "Ana".into(),
            timestamp: "2025-01-15T10:30:00Z".into(),
        };
        assert!(utc.registered_at().is_some());

        // Naive isoformat, as written by the reference storage backend.
        let naive = FaceRecord {
            id: 2,
            name: "Bob".into(),
            timestamp: "2025-01-15T10:30:00.123456".into(),
        };
        assert!(naive.registered_at().is_some());

        let garbage = FaceRecord { id: 3, name: "x".into(), timestamp: "not a date".into() };
        assert!(garbage.registered_at().is_none());
    }
}
