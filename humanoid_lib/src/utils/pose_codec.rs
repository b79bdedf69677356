//! Pose datagram codec.
//!
//! A datagram is UTF-8 JSON whose top-level keys are joint wire names, each
//! mapping to `{"x": .., "y": .., "z": ..}`. Unknown keys are ignored. A
//! joint that is absent or not a numeric `x/y/z` record reads as the origin.

use crate::error::DecodeError;
use crate::types::{JointName, PoseSnapshot};
use nalgebra::Vector3;
use serde_json::{Map, Value};

pub fn decode(raw: &[u8]) -> Result<PoseSnapshot, DecodeError> {
    let text = std::str::from_utf8(raw)?;

    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let Value::Object(record) = value else {
        return Err(DecodeError::Malformed(
            "top-level value is not an object".to_string(),
        ));
    };

    Ok(PoseSnapshot::from_joints(JointName::ALL.iter().filter_map(
        |&name| {
            record
                .get(name.as_str())
                .and_then(parse_position)
                .map(|position| (name, position))
        },
    )))
}

fn parse_position(value: &Value) -> Option<Vector3<f64>> {
    let joint = value.as_object()?;
    let axis = |key: &str| joint.get(key).and_then(Value::as_f64);
    Some(Vector3::new(axis("x")?, axis("y")?, axis("z")?))
}

/// Encode a snapshot in the same wire format `decode` accepts.
pub fn encode(snapshot: &PoseSnapshot) -> Vec<u8> {
    let mut record = Map::new();
    for (name, position) in snapshot.iter() {
        record.insert(
            name.as_str().to_string(),
            serde_json::json!({ "x": position.x, "y": position.y, "z": position.z }),
        );
    }
    Value::Object(record).to_string().into_bytes()
}
