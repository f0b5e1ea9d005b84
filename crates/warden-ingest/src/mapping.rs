//! Vendor-to-standard type lookups.
//!
//! Two tables, both keyed by `(vendor category, raw identifier)`:
//!
//! - device types map onto a standardized [`DeviceKind`]/subtype, falling
//!   back to [`DeviceKind::Unmapped`] rather than failing — an inventory
//!   row is never rejected for an unknown model string;
//! - event types map onto a standardized event type/subtype, or nothing at
//!   all — an unmapped vendor event is dropped, which is a valid non-error
//!   outcome.

use warden_core::model::DeviceKind;
use warden_core::policy::event_types;
use warden_core::vendor::VendorKind;

/// Maps a vendor device type identifier to a standardized kind/subtype.
///
/// Unknown identifiers map to [`DeviceKind::Unmapped`].
#[must_use]
pub fn map_device_type(vendor: VendorKind, raw: &str) -> (DeviceKind, Option<&'static str>) {
    match vendor {
        VendorKind::Passage => match raw {
            "door" => (DeviceKind::Door, None),
            "gate" => (DeviceKind::Door, Some("gate")),
            "reader" => (DeviceKind::Door, Some("reader")),
            "motion_pir" => (DeviceKind::MotionSensor, Some("pir")),
            "glass_break" => (DeviceKind::GlassBreak, None),
            "acu" => (DeviceKind::Panel, Some("controller")),
            _ => (DeviceKind::Unmapped, None),
        },
        VendorKind::Lumen => match raw {
            "cam" => (DeviceKind::Camera, None),
            "cam.indoor" => (DeviceKind::Camera, Some("indoor")),
            "cam.outdoor" => (DeviceKind::Camera, Some("outdoor")),
            "analytics.motion" => (DeviceKind::MotionSensor, Some("video")),
            _ => (DeviceKind::Unmapped, None),
        },
    }
}

/// Maps a vendor event type identifier to a standardized event
/// type/subtype.
///
/// Returns `None` when the vendor event has no mapped meaning; the
/// normalizer drops such events without error.
#[must_use]
pub fn map_event_type(
    vendor: VendorKind,
    raw: &str,
) -> Option<(&'static str, Option<&'static str>)> {
    match vendor {
        VendorKind::Passage => match raw {
            "door.forced" => Some((event_types::DOOR_FORCED_OPEN, None)),
            "door.held" => Some((event_types::DOOR_HELD_OPEN, None)),
            "door.position" => Some((event_types::DOOR_STATUS, None)),
            "access.granted" => Some((event_types::ACCESS_GRANTED, None)),
            "access.denied" => Some((event_types::ACCESS_DENIED, None)),
            "access.denied.repeated" => {
                Some((event_types::ACCESS_DENIED, Some("repeated_failure")))
            }
            _ => None,
        },
        VendorKind::Lumen => match raw {
            "motion.start" | "motion.stop" => Some((event_types::MOTION, None)),
            "audio.glassbreak" => Some((event_types::GLASS_BREAK, None)),
            "camera.offline" => Some((event_types::CAMERA_OFFLINE, None)),
            "camera.online" => Some((event_types::CAMERA_ONLINE, None)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_types_become_unmapped_not_errors() {
        let (kind, subtype) = map_device_type(VendorKind::Passage, "thermostat-9000");
        assert_eq!(kind, DeviceKind::Unmapped);
        assert!(subtype.is_none());
    }

    #[test]
    fn device_mapping_is_vendor_scoped() {
        assert_eq!(map_device_type(VendorKind::Passage, "door").0, DeviceKind::Door);
        // The same raw string means nothing to the video vendor.
        assert_eq!(map_device_type(VendorKind::Lumen, "door").0, DeviceKind::Unmapped);
    }

    #[test]
    fn unmapped_events_are_dropped() {
        assert!(map_event_type(VendorKind::Passage, "firmware.updated").is_none());
        assert!(map_event_type(VendorKind::Lumen, "door.forced").is_none());
    }

    #[test]
    fn repeated_denial_maps_with_subtype() {
        let (event_type, subtype) =
            map_event_type(VendorKind::Passage, "access.denied.repeated").expect("mapped");
        assert_eq!(event_type, event_types::ACCESS_DENIED);
        assert_eq!(subtype, Some("repeated_failure"));
    }
}
