use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "gyro_mouse".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Tuning of the gyro-to-pointer conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Rates at or below this magnitude (rad/s) produce no movement
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f32,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            dead_zone: default_dead_zone(),
            sensitivity: default_sensitivity(),
        }
    }
}

fn default_dead_zone() -> f32 {
    0.15
}
fn default_sensitivity() -> f32 {
    0.8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HidSettings {
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    /// SDP device subclass (0x80 = pointing device)
    #[serde(default = "default_subclass")]
    pub subclass: u8,
    #[serde(default = "default_click_release_ms")]
    pub click_release_ms: u64,
    #[serde(default = "default_connect_confirm_delay_ms")]
    pub connect_confirm_delay_ms: u64,
    #[serde(default = "default_true")]
    pub cancel_release_on_disconnect: bool,
    /// Peers the loopback transport treats as bonded
    #[serde(default)]
    pub bonded_devices: Vec<String>,
}

impl Default for HidSettings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            description: default_description(),
            provider: default_provider(),
            subclass: default_subclass(),
            click_release_ms: default_click_release_ms(),
            connect_confirm_delay_ms: default_connect_confirm_delay_ms(),
            cancel_release_on_disconnect: default_true(),
            bonded_devices: Vec::new(),
        }
    }
}

fn default_device_name() -> String {
    "Gyro Mouse".to_string()
}
fn default_description() -> String {
    "Bluetooth Gyro Controller".to_string()
}
fn default_provider() -> String {
    "AnyNameForProvider".to_string()
}
fn default_subclass() -> u8 {
    0x80
}
fn default_click_release_ms() -> u64 {
    50
}
fn default_connect_confirm_delay_ms() -> u64 {
    3000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub motion: MotionSettings,
    #[serde(default)]
    pub hid: HidSettings,

    /// JSON-lines sample feed; `None` or "-" reads stdin
    #[serde(default)]
    pub sensor_feed: Option<String>,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::open(settings_path))
    }

    /// Load from `path`, falling back to defaults if the file is missing or malformed.
    pub fn open(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("GyroMouse");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("gyro_mouse_{}_{}", name, std::process::id()));
        fs::create_dir_all(&path).unwrap();
        path.push("settings.json");
        path
    }

    #[test]
    fn test_defaults_match_source_constants() {
        let settings = Settings::default();
        assert_eq!(settings.motion.dead_zone, 0.15);
        assert_eq!(settings.motion.sensitivity, 0.8);
        assert_eq!(settings.hid.click_release_ms, 50);
        assert_eq!(settings.hid.subclass, 0x80);
        assert!(settings.hid.cancel_release_on_disconnect);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"motion":{"sensitivity":1.5},"hid":{}}"#).unwrap();
        assert_eq!(settings.motion.sensitivity, 1.5);
        assert_eq!(settings.motion.dead_zone, 0.15);
        assert_eq!(settings.hid.device_name, "Gyro Mouse");
        assert_eq!(settings.log_settings.level, "info");
    }

    #[test]
    fn test_save_and_reopen() {
        let path = scratch_path("save");
        let mut service = SettingsService::open(path.clone());
        service.get_mut().hid.bonded_devices.push("AA:BB".to_string());
        service.get_mut().motion.dead_zone = 0.2;
        service.save().unwrap();

        let reopened = SettingsService::open(path.clone());
        assert_eq!(reopened.get().hid.bonded_devices, vec!["AA:BB".to_string()]);
        assert_eq!(reopened.get().motion.dead_zone, 0.2);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let path = scratch_path("malformed");
        fs::write(&path, "{ not json").unwrap();
        let service = SettingsService::open(path.clone());
        assert_eq!(service.get().motion.dead_zone, 0.15);
        let _ = fs::remove_file(path);
    }
}
