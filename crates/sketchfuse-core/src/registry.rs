//! The authoritative set of placed canvas objects.

use crate::object::{CanvasObject, ObjectId, SketchImage};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Ordered collection of all objects on the canvas.
///
/// The sequence order carries no meaning; stacking is governed entirely by
/// each object's `z`. Both `id` and `z` come from monotone counters owned by
/// the registry, so ids are never reused and z strictly increases on every
/// creation or bring-to-front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRegistry {
    objects: Vec<CanvasObject>,
    next_id: ObjectId,
    next_z: u64,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            next_id: 1,
            next_z: 1,
        }
    }

    /// Place a new object, assigning a fresh id and the next z.
    /// Returns the assigned id.
    pub fn add(&mut self, position: Point, image: Option<SketchImage>) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        let z = self.next_z;
        self.next_z += 1;
        self.objects.push(CanvasObject::new(id, position, z, image));
        id
    }

    /// Move an object to a new position.
    ///
    /// Unknown ids are a no-op: the object may have been removed while a
    /// drag was still delivering position updates.
    pub fn update_position(&mut self, id: ObjectId, position: Point) {
        if let Some(object) = self.objects.iter_mut().find(|o| o.id == id) {
            object.position = position;
        }
    }

    /// Restack an object above everything else.
    /// Returns false if the id is unknown.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let z = self.next_z;
        match self.objects.iter_mut().find(|o| o.id == id) {
            Some(object) => {
                object.z = z;
                self.next_z += 1;
                true
            }
            None => false,
        }
    }

    /// Remove an object, returning it if present.
    pub fn remove(&mut self, id: ObjectId) -> Option<CanvasObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    /// Look up an object by id.
    pub fn get(&self, id: ObjectId) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// All objects, in insertion order.
    pub fn objects(&self) -> &[CanvasObject] {
        &self.objects
    }

    /// Iterate over all objects.
    pub fn iter(&self) -> impl Iterator<Item = &CanvasObject> {
        self.objects.iter()
    }

    /// Highest z currently on the canvas (0 when empty).
    pub fn max_z(&self) -> u64 {
        self.objects.iter().map(|o| o.z).max().unwrap_or(0)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the canvas is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Serialize the registry to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a registry from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
