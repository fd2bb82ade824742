//! Property-based tests for BrowserSettings persistence.
//!
//! Any settings value written by the settings engine reads back unchanged,
//! both through JSON directly and through the file on disk.

use proptest::prelude::*;
use quietbrowser::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use quietbrowser::types::settings::{
    BrowserSettings, GeneralSettings, PrivacySettings, WindowSettings,
};

fn arb_url() -> impl Strategy<Value = String> {
    (prop_oneof![Just("http"), Just("https")], "[a-z]{1,12}\\.[a-z]{2,4}", "[a-z0-9/]{0,20}")
        .prop_map(|(scheme, host, path)| format!("{}://{}/{}", scheme, host, path))
}

fn arb_general_settings() -> impl Strategy<Value = GeneralSettings> {
    (arb_url(), arb_url(), arb_url(), any::<bool>()).prop_map(
        |(new_tab_url, search_url, start_page_fallback_url, start_page_fail_open)| {
            GeneralSettings {
                new_tab_url,
                search_url: format!("{}?q=", search_url),
                start_page_fallback_url,
                start_page_fail_open,
            }
        },
    )
}

fn arb_privacy_settings() -> impl Strategy<Value = PrivacySettings> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(content_blocking, canvas_protection, https_upgrade, ephemeral_storage)| PrivacySettings {
            content_blocking,
            canvas_protection,
            https_upgrade,
            ephemeral_storage,
        },
    )
}

fn arb_window_settings() -> impl Strategy<Value = WindowSettings> {
    (320u32..=7680, 240u32..=4320, 320u32..=1024, 240u32..=768).prop_map(
        |(width, height, min_width, min_height)| WindowSettings {
            width,
            height,
            min_width,
            min_height,
        },
    )
}

fn arb_browser_settings() -> impl Strategy<Value = BrowserSettings> {
    (arb_general_settings(), arb_privacy_settings(), arb_window_settings()).prop_map(
        |(general, privacy, window)| BrowserSettings {
            general,
            privacy,
            window,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn settings_serialization_roundtrip(settings in arb_browser_settings()) {
        let json = serde_json::to_string(&settings)
            .expect("Serialization to JSON should succeed for any valid BrowserSettings");
        let deserialized: BrowserSettings = serde_json::from_str(&json)
            .expect("Deserialization from JSON should succeed for valid JSON");
        prop_assert_eq!(deserialized, settings);
    }

    #[test]
    fn settings_file_roundtrip(settings in arb_browser_settings()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut writer = SettingsEngine::new(Some(path.clone()));
        writer.load().unwrap();
        let value = serde_json::to_value(&settings).unwrap();
        for section in ["general", "privacy", "window"] {
            for (key, field) in value[section].as_object().unwrap() {
                writer.set_value(&format!("{}.{}", section, key), field.clone()).unwrap();
            }
        }

        let mut reader = SettingsEngine::new(Some(path));
        prop_assert_eq!(reader.load().unwrap(), settings);
    }
}
