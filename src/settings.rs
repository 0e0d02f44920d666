use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::font::FontChoice;
use crate::layout::{Alignment, LayoutBox, Orientation, OverflowPolicy};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    pub path: Option<String>,
    pub family: Option<String>,
    pub size: f32,
    pub color: String,
}

impl FontSettings {
    fn family(family: &str, color: &str) -> Self {
        Self {
            path: None,
            family: Some(family.to_string()),
            size: 32.0,
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub server_output_dir: String,
    pub server_public_url: Option<String>,
    pub server_body_limit: usize,
    pub layout: LayoutBox,
    pub font_default: FontSettings,
    pub font_sans: FontSettings,
    pub font_serif: FontSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:80".to_string(),
            server_output_dir: "output".to_string(),
            server_public_url: None,
            server_body_limit: 10 * 1024 * 1024,
            layout: LayoutBox::new(187.5, 150.0, 400.0, 400.0)
                .with_orientation(Orientation::Vertical)
                .with_alignment(Alignment::Center),
            font_default: FontSettings::family("sans-serif", "#000000"),
            font_sans: FontSettings::family("sans-serif", "#000000"),
            font_serif: FontSettings::family("serif", "#ffffff"),
        }
    }
}

impl Settings {
    pub fn font(&self, choice: FontChoice) -> &FontSettings {
        match choice {
            FontChoice::Default => &self.font_default,
            FontChoice::Sans => &self.font_sans,
            FontChoice::Serif => &self.font_serif,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSection>,
    layout: Option<LayoutSection>,
    fonts: Option<FontsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    output_dir: Option<String>,
    public_url: Option<String>,
    body_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSection {
    orientation: Option<Orientation>,
    alignment: Option<Alignment>,
    overflow: Option<OverflowPolicy>,
    x: Option<f32>,
    y: Option<f32>,
    max_width: Option<f32>,
    max_height: Option<f32>,
    vertical_center: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FontsSection {
    default: Option<FontSection>,
    sans: Option<FontSection>,
    serif: Option<FontSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSection {
    path: Option<String>,
    family: Option<String>,
    size: Option<f32>,
    color: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
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

    if let Ok(port) = std::env::var("PORT") {
        settings.server_addr = with_port(&settings.server_addr, &port)?;
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr;
                }
            }
            if let Some(dir) = server.output_dir {
                if !dir.trim().is_empty() {
                    self.server_output_dir = dir;
                }
            }
            if let Some(url) = server.public_url {
                let url = url.trim().trim_end_matches('/');
                self.server_public_url = if url.is_empty() {
                    None
                } else {
                    Some(url.to_string())
                };
            }
            if let Some(limit) = server.body_limit {
                if limit > 0 {
                    self.server_body_limit = limit;
                }
            }
        }
        if let Some(layout) = incoming.layout {
            let target = &mut self.layout;
            if let Some(orientation) = layout.orientation {
                target.orientation = orientation;
            }
            if let Some(alignment) = layout.alignment {
                target.alignment = alignment;
            }
            if let Some(overflow) = layout.overflow {
                target.overflow = overflow;
            }
            if let Some(x) = layout.x {
                target.x = x;
            }
            if let Some(y) = layout.y {
                target.y = y;
            }
            if let Some(width) = layout.max_width {
                target.max_width = width;
            }
            if let Some(height) = layout.max_height {
                target.max_height = height;
            }
            if let Some(center) = layout.vertical_center {
                target.vertical_center = center;
            }
        }
        if let Some(fonts) = incoming.fonts {
            merge_font(&mut self.font_default, fonts.default);
            merge_font(&mut self.font_sans, fonts.sans);
            merge_font(&mut self.font_serif, fonts.serif);
        }
    }
}

fn merge_font(target: &mut FontSettings, incoming: Option<FontSection>) {
    let Some(font) = incoming else {
        return;
    };
    if let Some(path) = font.path {
        if !path.trim().is_empty() {
            target.path = Some(path);
        }
    }
    if let Some(family) = font.family {
        if !family.trim().is_empty() {
            target.family = Some(family);
        }
    }
    if let Some(size) = font.size {
        if size > 0.0 {
            target.size = size;
        }
    }
    if let Some(color) = font.color {
        if !color.trim().is_empty() {
            target.color = color;
        }
    }
}

/// Replaces the port of `addr` (`host:port`) with `port`.
fn with_port(addr: &str, port: &str) -> Result<String> {
    let port: u16 = port
        .trim()
        .parse()
        .with_context(|| format!("invalid PORT value: {}", port))?;
    let host = addr
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(addr);
    Ok(format!("{}:{}", host, port))
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
            Some(Path::new(home).join(".label-stamp"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn bundled_settings_match_defaults() {
        let parsed: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML).expect("parse bundled");
        let mut merged = Settings::default();
        merged.merge(parsed);
        let defaults = Settings::default();
        assert_eq!(merged.server_addr, defaults.server_addr);
        assert_eq!(merged.layout, defaults.layout);
        assert_eq!(merged.font_default, defaults.font_default);
        assert_eq!(merged.font_sans, defaults.font_sans);
        assert_eq!(merged.font_serif, defaults.font_serif);
    }

    #[test]
    fn load_writes_home_settings_file() {
        with_temp_home(|home| {
            load_settings(None).expect("load settings");
            assert!(home.join(".label-stamp").join("settings.toml").exists());
        });
    }

    #[test]
    fn extra_settings_file_overrides_fields() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(
                &extra,
                r##"
[layout]
orientation = "horizontal"
overflow = "truncate"
max_width = 250

[fonts.sans]
size = 48
color = "#ff0000"
"##,
            )
            .expect("write extra");
            let settings = load_settings(Some(&extra)).expect("load settings");
            assert_eq!(settings.layout.orientation, Orientation::Horizontal);
            assert_eq!(settings.layout.overflow, OverflowPolicy::Truncate);
            assert_eq!(settings.layout.max_width, 250.0);
            assert_eq!(settings.layout.max_height, 400.0);
            assert_eq!(settings.font_sans.size, 48.0);
            assert_eq!(settings.font_sans.color, "#ff0000");
            assert_eq!(settings.font_serif.color, "#ffffff");
        });
    }

    #[test]
    fn missing_extra_settings_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("nope.toml"))).unwrap_err();
            assert!(err.to_string().contains("settings file not found"));
        });
    }

    #[test]
    fn port_replaces_the_address_port() {
        assert_eq!(with_port("0.0.0.0:80", "8001").unwrap(), "0.0.0.0:8001");
        assert_eq!(with_port("[::1]:80", "9000").unwrap(), "[::1]:9000");
        assert!(with_port("0.0.0.0:80", "http").is_err());
    }
}
