use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::InventoryError;

/// Canonical identity of a stocking location: a property, optionally narrowed
/// to a unit and a room.
///
/// Equality is structural over all three components. An absent `unit_id` or
/// `room_id` is significant: a level keyed at the property is distinct from a
/// level keyed at any of its units, and absence is never treated as a
/// wildcard during lookups.
///
/// `Ord` exists so that two locations can be locked in a fixed global order
/// during transfers; it carries no domain meaning.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct LocationKey {
    pub property_id: Uuid,
    pub unit_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

impl LocationKey {
    /// Canonicalizes the raw component ids into a location identity.
    ///
    /// A room is only addressable inside a unit, so `room_id` without
    /// `unit_id` is rejected before it can mint a key nothing else will ever
    /// match.
    pub fn resolve(
        property_id: Uuid,
        unit_id: Option<Uuid>,
        room_id: Option<Uuid>,
    ) -> Result<Self, InventoryError> {
        if room_id.is_some() && unit_id.is_none() {
            return Err(InventoryError::validation(
                "room_id requires a unit_id; a room is addressed within a unit",
            ));
        }
        Ok(Self {
            property_id,
            unit_id,
            room_id,
        })
    }

    /// Location scoped to the whole property.
    pub fn property(property_id: Uuid) -> Self {
        Self {
            property_id,
            unit_id: None,
            room_id: None,
        }
    }

    /// Human-readable path for display, joining the present components with
    /// `/`. Never used for identity comparison.
    pub fn path(&self, location_name: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(4);
        if let Some(name) = location_name {
            if !name.is_empty() {
                parts.push(name.to_string());
            }
        }
        parts.push(self.property_id.to_string());
        if let Some(unit) = self.unit_id {
            parts.push(unit.to_string());
        }
        if let Some(room) = self.room_id {
            parts.push(room.to_string());
        }
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_is_significant_for_equality() {
        let property = Uuid::new_v4();
        let unit = Uuid::new_v4();
        let at_property = LocationKey::resolve(property, None, None).unwrap();
        let at_unit = LocationKey::resolve(property, Some(unit), None).unwrap();
        assert_ne!(at_property, at_unit);
        assert_eq!(at_property, LocationKey::property(property));
    }

    #[test]
    fn room_without_unit_is_rejected() {
        let result = LocationKey::resolve(Uuid::new_v4(), None, Some(Uuid::new_v4()));
        assert!(matches!(result, Err(InventoryError::ValidationError(_))));
    }

    #[test]
    fn path_joins_present_components() {
        let property = Uuid::new_v4();
        let unit = Uuid::new_v4();
        let key = LocationKey::resolve(property, Some(unit), None).unwrap();
        let path = key.path(Some("Harborview"));
        assert_eq!(path, format!("Harborview/{}/{}", property, unit));
        // Display only: identical path prefix never implies identical key.
        assert_eq!(key.path(None), format!("{}/{}", property, unit));
    }
}
