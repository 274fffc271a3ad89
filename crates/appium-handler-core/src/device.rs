//! Device-level value types: geolocation and screen orientation.

use serde::{Deserialize, Serialize};

/// A geographic location reported by or pushed to the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

/// Screen orientation as understood by the Appium server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScreenOrientation {
    Portrait,
    Landscape,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_uses_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_value(ScreenOrientation::Landscape).unwrap(),
            serde_json::json!("LANDSCAPE")
        );
        let parsed: ScreenOrientation = serde_json::from_str("\"PORTRAIT\"").unwrap();
        assert_eq!(parsed, ScreenOrientation::Portrait);
    }

    #[test]
    fn location_altitude_defaults_to_zero() {
        let loc: Location =
            serde_json::from_str(r#"{"latitude": 40.4, "longitude": -3.7}"#).unwrap();
        assert_eq!(loc.altitude, 0.0);
    }
}
