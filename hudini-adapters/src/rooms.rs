use hudini_core::RoomStatus;
use tracing::warn;

/// Scope a property-wide room listing to `property_id`.
///
/// Records without a property are stamped with the requested one; records
/// that name a different property are dropped.
pub fn retain_property(provider: &str, property_id: &str, rooms: Vec<RoomStatus>) -> Vec<RoomStatus> {
    let total = rooms.len();
    let scoped: Vec<RoomStatus> = rooms
        .into_iter()
        .filter_map(|mut room| {
            if room.property_id.is_empty() {
                room.property_id = property_id.to_string();
            }
            (room.property_id == property_id).then_some(room)
        })
        .collect();

    if scoped.len() != total {
        warn!(
            provider = %provider,
            property_id = %property_id,
            dropped = total - scoped.len(),
            "vendor returned rooms belonging to another property"
        );
    }
    scoped
}
