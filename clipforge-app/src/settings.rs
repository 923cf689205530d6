//! Persistent host settings (JSON file in the user data directory).
//!
//! Settings are exported as `CLIPFORGE_*` / `OPENAI_API_KEY` environment
//! variables before the pipeline config is read, so the environment always
//! wins over the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_TTS_VOICE: &str = "nova";
const TTS_VOICES: &[&str] = &["alloy", "echo", "fable", "nova", "onyx", "shimmer"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub temp_dir: Option<String>,
    pub background_path: Option<String>,
    pub background_url: Option<String>,
    pub font_path: Option<String>,
    pub font_size: u32,
    pub max_script_chars: usize,
    pub openai_api_key: Option<String>,
    pub tts_voice: String,
    pub edge_voice: Option<String>,
    pub sweep_interval_secs: u64,
    pub max_file_age_secs: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            temp_dir: None,
            background_path: None,
            background_url: None,
            font_path: None,
            font_size: 90,
            max_script_chars: 2_200,
            openai_api_key: None,
            tts_voice: DEFAULT_TTS_VOICE.into(),
            edge_voice: None,
            sweep_interval_secs: 30 * 60,
            max_file_age_secs: 60 * 60,
        }
    }
}

/// What `clipforge settings` prints: the credential is reduced to a flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    pub temp_dir: Option<String>,
    pub background_path: Option<String>,
    pub background_url: Option<String>,
    pub font_path: Option<String>,
    pub font_size: u32,
    pub max_script_chars: usize,
    pub has_openai_api_key: bool,
    pub tts_voice: String,
    pub edge_voice: Option<String>,
    pub sweep_interval_secs: u64,
    pub max_file_age_secs: u64,
}

impl AppSettings {
    pub fn normalize(&mut self) {
        for field in [
            &mut self.temp_dir,
            &mut self.background_path,
            &mut self.background_url,
            &mut self.font_path,
            &mut self.openai_api_key,
            &mut self.edge_voice,
        ] {
            *field = trimmed(field.take());
        }
        self.font_size = self.font_size.clamp(8, 400);
        self.max_script_chars = self.max_script_chars.clamp(1, 100_000);
        self.tts_voice = normalize_tts_voice(&self.tts_voice);
        self.sweep_interval_secs = self.sweep_interval_secs.clamp(10, 7 * 24 * 3600);
        self.max_file_age_secs = self.max_file_age_secs.min(30 * 24 * 3600);
    }

    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            temp_dir: self.temp_dir.clone(),
            background_path: self.background_path.clone(),
            background_url: self.background_url.clone(),
            font_path: self.font_path.clone(),
            font_size: self.font_size,
            max_script_chars: self.max_script_chars,
            has_openai_api_key: self.openai_api_key.is_some(),
            tts_voice: self.tts_voice.clone(),
            edge_voice: self.edge_voice.clone(),
            sweep_interval_secs: self.sweep_interval_secs,
            max_file_age_secs: self.max_file_age_secs,
        }
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn normalize_tts_voice(raw: &str) -> String {
    let voice = raw.trim().to_ascii_lowercase();
    if TTS_VOICES.contains(&voice.as_str()) {
        voice
    } else {
        DEFAULT_TTS_VOICE.into()
    }
}

/// Environment variables the settings map to, in export order.
pub fn runtime_env_pairs(settings: &AppSettings) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    let optional = [
        ("CLIPFORGE_TEMP_DIR", &settings.temp_dir),
        ("CLIPFORGE_BACKGROUND_PATH", &settings.background_path),
        ("CLIPFORGE_BACKGROUND_URL", &settings.background_url),
        ("CLIPFORGE_FONT_PATH", &settings.font_path),
        ("CLIPFORGE_EDGE_VOICE", &settings.edge_voice),
        ("OPENAI_API_KEY", &settings.openai_api_key),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            pairs.push((key, v.clone()));
        }
    }
    pairs.push(("CLIPFORGE_FONT_SIZE", settings.font_size.to_string()));
    pairs.push(("CLIPFORGE_MAX_SCRIPT_CHARS", settings.max_script_chars.to_string()));
    pairs.push(("CLIPFORGE_TTS_VOICE", settings.tts_voice.clone()));
    pairs.push((
        "CLIPFORGE_SWEEP_INTERVAL_SECS",
        settings.sweep_interval_secs.to_string(),
    ));
    pairs.push((
        "CLIPFORGE_MAX_FILE_AGE_SECS",
        settings.max_file_age_secs.to_string(),
    ));
    pairs
}

/// Export settings to the environment, never overriding a variable that is
/// already set. Call before any thread is spawned.
pub fn apply_runtime_env_from_settings(settings: &AppSettings) {
    for (key, value) in runtime_env_pairs(settings) {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Clipforge")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("clipforge")
            .join("settings.json")
    }
}

/// Missing or unreadable files yield defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_garbled_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.json");
        assert_eq!(load_settings(&missing), AppSettings::default());

        let garbled = dir.path().join("bad.json");
        fs::write(&garbled, "{ not json").unwrap();
        assert_eq!(load_settings(&garbled), AppSettings::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_absent_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"fontSize": 72, "ttsVoice": " Onyx "}"#).unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.font_size, 72);
        assert_eq!(settings.tts_voice, "onyx");
        assert_eq!(settings.max_script_chars, 2_200);
    }

    #[test]
    fn normalize_clamps_and_trims() {
        let mut settings = AppSettings {
            font_size: 2,
            max_script_chars: 0,
            tts_voice: "robot".into(),
            openai_api_key: Some("   ".into()),
            background_url: Some(" https://cdn.example/bg.mp4 ".into()),
            sweep_interval_secs: 0,
            ..AppSettings::default()
        };
        settings.normalize();

        assert_eq!(settings.font_size, 8);
        assert_eq!(settings.max_script_chars, 1);
        assert_eq!(settings.tts_voice, "nova");
        assert_eq!(settings.openai_api_key, None);
        assert_eq!(
            settings.background_url.as_deref(),
            Some("https://cdn.example/bg.mp4")
        );
        assert_eq!(settings.sweep_interval_secs, 10);
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let settings = AppSettings {
            temp_dir: Some("/srv/clipforge".into()),
            edge_voice: Some("en-GB-SoniaNeural".into()),
            ..AppSettings::default()
        };

        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path), settings);
    }

    #[test]
    fn env_pairs_skip_unset_optionals() {
        let settings = AppSettings {
            openai_api_key: Some("sk-test".into()),
            ..AppSettings::default()
        };
        let pairs = runtime_env_pairs(&settings);
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| *k).collect();

        assert!(keys.contains(&"OPENAI_API_KEY"));
        assert!(!keys.contains(&"CLIPFORGE_TEMP_DIR"));
        assert!(pairs.contains(&("CLIPFORGE_TTS_VOICE", "nova".to_string())));
        assert!(pairs.contains(&("CLIPFORGE_MAX_FILE_AGE_SECS", "3600".to_string())));
    }

    #[test]
    fn runtime_settings_hide_the_key() {
        let settings = AppSettings {
            openai_api_key: Some("sk-secret".into()),
            ..AppSettings::default()
        };
        let json = serde_json::to_string(&settings.runtime_settings()).unwrap();
        assert!(json.contains("\"hasOpenaiApiKey\":true"));
        assert!(!json.contains("sk-secret"));
    }
}
