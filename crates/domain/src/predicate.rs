//! Pure predicates deciding whether a device should be recast.

use crate::config::DeviceConfig;
use crate::entity::EntityState;

/// Application identifier a media player reports while showing the dashboard.
pub const CAST_APP_NAME: &str = "DashCast";

/// Whether `config`'s device may be recast right now.
///
/// `device_state` and `gate_state` are the current states of the device
/// and of its enable switch; `None` means the host does not know the
/// entity. A configured switch that is missing or not `on` blocks the
/// recast, as does an unavailable or unknown device.
#[must_use]
pub fn should_cast(
    config: &DeviceConfig,
    device_state: Option<&EntityState>,
    gate_state: Option<&EntityState>,
) -> bool {
    if config.enable_switch.is_some() && gate_state != Some(&EntityState::On) {
        return false;
    }
    device_state.is_some_and(EntityState::is_available)
}

/// Whether the device is currently showing the cast dashboard.
#[must_use]
pub fn is_casting(app_name: Option<&str>) -> bool {
    app_name == Some(CAST_APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceSettings;

    fn config(enable_switch: Option<&str>) -> DeviceConfig {
        let settings = DeviceSettings {
            dashboard_url: Some("http://dash".to_string()),
            enable_switch: enable_switch.map(ToString::to_string),
            ..DeviceSettings::default()
        };
        DeviceConfig::resolve("media_player.kitchen", &settings).unwrap()
    }

    #[test]
    fn should_cast_when_available_and_ungated() {
        assert!(should_cast(&config(None), Some(&EntityState::Off), None));
        assert!(should_cast(&config(None), Some(&EntityState::Idle), None));
    }

    #[test]
    fn should_not_cast_when_device_unavailable() {
        assert!(!should_cast(&config(None), Some(&EntityState::Unavailable), None));
        assert!(!should_cast(
            &config(Some("input_boolean.kiosk")),
            Some(&EntityState::Unavailable),
            Some(&EntityState::On)
        ));
    }

    #[test]
    fn should_not_cast_when_device_missing() {
        assert!(!should_cast(&config(None), None, None));
    }

    #[test]
    fn should_not_cast_when_switch_is_not_on_regardless_of_device_state() {
        let gated = config(Some("input_boolean.kiosk"));
        for device in [
            EntityState::Off,
            EntityState::Idle,
            EntityState::Paused,
            EntityState::Playing,
        ] {
            assert!(!should_cast(&gated, Some(&device), Some(&EntityState::Off)));
            assert!(!should_cast(&gated, Some(&device), Some(&EntityState::Unavailable)));
            assert!(!should_cast(&gated, Some(&device), None));
        }
    }

    #[test]
    fn should_cast_when_switch_is_on() {
        let gated = config(Some("input_boolean.kiosk"));
        assert!(should_cast(&gated, Some(&EntityState::Idle), Some(&EntityState::On)));
    }

    #[test]
    fn should_ignore_gate_state_when_no_switch_configured() {
        assert!(should_cast(&config(None), Some(&EntityState::Off), Some(&EntityState::Off)));
    }

    #[test]
    fn should_detect_casting_only_on_exact_app_name() {
        assert!(is_casting(Some("DashCast")));
        assert!(!is_casting(Some("dashcast")));
        assert!(!is_casting(Some("YouTube")));
        assert!(!is_casting(Some("")));
        assert!(!is_casting(None));
    }
}
