//! Kueue admission annotation
//!
//! Kueue-managed Jobs must reach the cluster suspended so the queue
//! controller can admit and release them; the queue itself is selected by a
//! well-known annotation on the Job metadata.

use serde_json::{Map, Value};
use tracing::debug;

/// Annotate a manifest for admission through the named Kueue LocalQueue.
///
/// Creates the `metadata`, `metadata.annotations`, and `spec` mappings when
/// absent, sets the queue-name annotation, and forces `spec.suspend: true`.
/// Idempotent. Does nothing when `queue` is `None`.
pub fn annotate_for_queue(manifest: &mut Value, queue: Option<&str>) {
    let Some(queue) = queue else { return };
    let Some(root) = manifest.as_object_mut() else {
        return;
    };

    let metadata = ensure_object(root, "metadata");
    let annotations = ensure_object(metadata, "annotations");
    annotations.insert(
        crate::KUEUE_QUEUE_ANNOTATION.to_string(),
        Value::String(queue.to_string()),
    );

    let spec = ensure_object(root, "spec");
    spec.insert("suspend".to_string(), Value::Bool(true));

    debug!(queue = %queue, "annotated job for kueue admission");
}

/// Get `map[key]` as a mutable mapping, inserting an empty one when the key
/// is absent or holds a non-mapping value.
fn ensure_object<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut()
        .expect("slot was just ensured to be a mapping")
}
