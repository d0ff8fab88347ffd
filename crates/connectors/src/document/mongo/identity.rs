//! Physical encodings a primary-key value may be stored under.
//!
//! Keys reach the connector as opaque strings, but a document's `_id` may
//! hold a string, an ObjectId or a UUID binary. Lookups try each plausible
//! encoding in that fixed order.

use crate::document::mongo::convert::{to_bson, uuid_binary};
use bson::{Bson, oid::ObjectId};
use model::core::value::Value;
use uuid::Uuid;

/// Empty when `id` has no BSON form, since no stored key can equal it.
pub fn id_candidates(id: &Value) -> Vec<Bson> {
    match id {
        Value::String(raw) => {
            let mut candidates = vec![Bson::String(raw.clone())];
            if let Ok(oid) = ObjectId::parse_str(raw) {
                candidates.push(Bson::ObjectId(oid));
            }
            if let Ok(uuid) = Uuid::parse_str(raw) {
                candidates.push(uuid_binary(&uuid));
            }
            candidates
        }
        Value::Uuid(uuid) => vec![uuid_binary(uuid), Bson::String(uuid.to_string())],
        other => to_bson(other.clone()).into_iter().collect(),
    }
}
