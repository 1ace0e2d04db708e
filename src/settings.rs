use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compose::{DEFAULT_BLUR_RADIUS, DEFAULT_FIELD_CAP};
use crate::gateway::{DEFAULT_COOLDOWN, DEFAULT_QUEUE_CAPACITY, GatewayConfig};
use crate::geometry::DEFAULT_PADDING;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub vision_api_key: Option<String>,
    pub vision_endpoint: Option<String>,
    pub queue_capacity: usize,
    pub cooldown: Duration,
    pub translate_api_key: Option<String>,
    pub translate_endpoint: Option<String>,
    pub overlay_font_path: Option<String>,
    pub overlay_font_family: Option<String>,
    pub blur_radius: f32,
    pub field_cap: usize,
    pub padding: i32,
    pub outline_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vision_api_key: None,
            vision_endpoint: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            cooldown: DEFAULT_COOLDOWN,
            translate_api_key: None,
            translate_endpoint: None,
            overlay_font_path: None,
            overlay_font_family: None,
            blur_radius: DEFAULT_BLUR_RADIUS,
            field_cap: DEFAULT_FIELD_CAP,
            padding: DEFAULT_PADDING,
            outline_color: "#7fff00".to_string(),
        }
    }
}

impl Settings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            capacity: self.queue_capacity,
            cooldown: self.cooldown,
        }
    }

    /// CLI key, then settings, then `GOOGLE_API_KEY`.
    pub fn vision_key(&self, cli_key: Option<&str>) -> Option<String> {
        resolve_key(cli_key, self.vision_api_key.as_deref())
    }

    pub fn translate_key(&self, cli_key: Option<&str>) -> Option<String> {
        resolve_key(cli_key, self.translate_api_key.as_deref())
    }
}

fn resolve_key(cli_key: Option<&str>, configured: Option<&str>) -> Option<String> {
    cli_key
        .map(str::to_string)
        .or_else(|| configured.map(str::to_string))
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    vision: Option<VisionSettings>,
    translate: Option<TranslateSettings>,
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct VisionSettings {
    api_key: Option<String>,
    endpoint: Option<String>,
    queue_capacity: Option<usize>,
    cooldown_secs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    api_key: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    font_path: Option<String>,
    font_family: Option<String>,
    blur_radius: Option<f32>,
    field_cap: Option<usize>,
    padding: Option<i32>,
    outline_color: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(vision) = incoming.vision {
            if let Some(key) = non_empty(vision.api_key) {
                self.vision_api_key = Some(key);
            }
            if let Some(endpoint) = non_empty(vision.endpoint) {
                self.vision_endpoint = Some(endpoint);
            }
            if let Some(capacity) = vision.queue_capacity.filter(|capacity| *capacity > 0) {
                self.queue_capacity = capacity;
            }
            if let Some(secs) = vision.cooldown_secs.filter(|secs| secs.is_finite() && *secs >= 0.0) {
                self.cooldown = Duration::from_secs_f64(secs);
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(key) = non_empty(translate.api_key) {
                self.translate_api_key = Some(key);
            }
            if let Some(endpoint) = non_empty(translate.endpoint) {
                self.translate_endpoint = Some(endpoint);
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(path) = non_empty(overlay.font_path) {
                self.overlay_font_path = Some(path);
            }
            if let Some(family) = non_empty(overlay.font_family) {
                self.overlay_font_family = Some(family);
            }
            if let Some(radius) = overlay.blur_radius.filter(|radius| *radius > 0.0) {
                self.blur_radius = radius;
            }
            if let Some(cap) = overlay.field_cap.filter(|cap| *cap > 0) {
                self.field_cap = cap;
            }
            if let Some(padding) = overlay.padding.filter(|padding| *padding >= 0) {
                self.padding = padding;
            }
            if let Some(color) = non_empty(overlay.outline_color) {
                self.outline_color = color;
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".trocr"))
        }
    })
}
