//! Microsoft Edge neural voices through the `edge-tts` command-line tool.
//!
//! The voice is picked from the script's detected language; undetectable text
//! uses the default English voice.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;
use whatlang::{Detector, Lang};

use crate::error::{ClipforgeError, Result};
use crate::tts::SpeechSynthesizer;

pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

/// ISO 639-1 code → regional neural voice.
const VOICES: &[(&str, &str)] = &[
    ("en", "en-US-JennyNeural"),
    ("fr", "fr-FR-DeniseNeural"),
    ("es", "es-ES-ElviraNeural"),
    ("de", "de-DE-KatjaNeural"),
    ("it", "it-IT-ElsaNeural"),
    ("pt", "pt-BR-FranciscaNeural"),
    ("nl", "nl-NL-ColetteNeural"),
    ("pl", "pl-PL-ZofiaNeural"),
    ("ru", "ru-RU-SvetlanaNeural"),
    ("tr", "tr-TR-EmelNeural"),
    ("ar", "ar-SA-ZariyahNeural"),
    ("hi", "hi-IN-SwaraNeural"),
    ("ja", "ja-JP-NanamiNeural"),
    ("ko", "ko-KR-SunHiNeural"),
    ("zh", "zh-CN-XiaoxiaoNeural"),
];

/// Detector language → voice table key.
const DETECTABLE: &[(Lang, &str)] = &[
    (Lang::Eng, "en"),
    (Lang::Fra, "fr"),
    (Lang::Spa, "es"),
    (Lang::Deu, "de"),
    (Lang::Ita, "it"),
    (Lang::Por, "pt"),
    (Lang::Nld, "nl"),
    (Lang::Pol, "pl"),
    (Lang::Rus, "ru"),
    (Lang::Tur, "tr"),
    (Lang::Ara, "ar"),
    (Lang::Hin, "hi"),
    (Lang::Jpn, "ja"),
    (Lang::Kor, "ko"),
    (Lang::Cmn, "zh"),
];

pub fn voice_for_language(lang: &str) -> Option<&'static str> {
    let lang = lang.trim().to_ascii_lowercase();
    VOICES
        .iter()
        .find(|(code, _)| *code == lang)
        .map(|(_, voice)| *voice)
}

/// Detect the script's language with `whatlang`, restricted to the languages
/// that have a voice. Returns the ISO 639-1 key used by the voice table.
pub fn guess_language(text: &str) -> Option<&'static str> {
    let detector = Detector::with_allowlist(DETECTABLE.iter().map(|(lang, _)| *lang).collect());
    let info = detector.detect(text)?;
    debug!(
        lang = info.lang().code(),
        confidence = info.confidence(),
        "script language detected"
    );
    DETECTABLE
        .iter()
        .find(|(lang, _)| *lang == info.lang())
        .map(|(_, code)| *code)
}

pub fn pick_voice(text: &str) -> &'static str {
    guess_language(text)
        .and_then(voice_for_language)
        .unwrap_or(DEFAULT_VOICE)
}

pub struct EdgeTtsCommand {
    program: PathBuf,
    voice_override: Option<String>,
}

impl EdgeTtsCommand {
    pub fn new(voice_override: Option<String>) -> Self {
        Self {
            program: PathBuf::from("edge-tts"),
            voice_override,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn voice_for(&self, text: &str) -> String {
        self.voice_override
            .clone()
            .unwrap_or_else(|| pick_voice(text).to_string())
    }
}

impl Default for EdgeTtsCommand {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SpeechSynthesizer for EdgeTtsCommand {
    fn name(&self) -> &'static str {
        "edge-tts"
    }

    fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
        let voice = self.voice_for(text);
        debug!(voice = %voice, "running edge-tts");

        let output = Command::new(&self.program)
            .arg("--voice")
            .arg(&voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(out)
            .output()
            .map_err(|e| {
                ClipforgeError::Synthesis(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            return Err(ClipforgeError::Synthesis(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !out.is_file() {
            return Err(ClipforgeError::Synthesis(format!(
                "{} produced no audio at {}",
                self.program.display(),
                out.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_and_undetectable_text_use_default_voice() {
        assert_eq!(
            pick_voice("Stay curious and keep building the things you wish existed in the world."),
            DEFAULT_VOICE
        );
        assert_eq!(pick_voice(""), DEFAULT_VOICE);
        assert_eq!(pick_voice("1234 !!"), DEFAULT_VOICE);
    }

    #[test]
    fn non_latin_scripts_pick_regional_voices() {
        assert_eq!(pick_voice("Привет, как дела?"), "ru-RU-SvetlanaNeural");
        assert_eq!(pick_voice("مرحبا بالعالم"), "ar-SA-ZariyahNeural");
        assert_eq!(pick_voice("नमस्ते दुनिया"), "hi-IN-SwaraNeural");
        assert_eq!(pick_voice("안녕하세요 세계"), "ko-KR-SunHiNeural");
        assert_eq!(pick_voice("你好世界"), "zh-CN-XiaoxiaoNeural");
        assert_eq!(pick_voice("こんにちは世界"), "ja-JP-NanamiNeural");
    }

    #[test]
    fn latin_script_languages_pick_regional_voices() {
        assert_eq!(
            pick_voice("Bonjour à tous, aujourd'hui nous allons parler de la cuisine française et de ses traditions."),
            "fr-FR-DeniseNeural"
        );
        assert_eq!(
            pick_voice("Hola a todos, hoy vamos a hablar de la historia de nuestra ciudad y de sus costumbres."),
            "es-ES-ElviraNeural"
        );
        assert_eq!(
            pick_voice("Guten Morgen, heute sprechen wir über die Geschichte unserer Stadt und ihre Menschen."),
            "de-DE-KatjaNeural"
        );
    }

    #[test]
    fn every_detectable_language_has_a_voice() {
        for (_, code) in DETECTABLE {
            assert!(voice_for_language(code).is_some(), "no voice for {code}");
        }
        assert_eq!(DETECTABLE.len(), VOICES.len());
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        assert_eq!(voice_for_language(" FR "), Some("fr-FR-DeniseNeural"));
        assert_eq!(voice_for_language("xx"), None);
    }

    #[test]
    fn override_beats_detection() {
        let tts = EdgeTtsCommand::new(Some("en-GB-SoniaNeural".into()));
        assert_eq!(tts.voice_for("Привет"), "en-GB-SoniaNeural");
    }

    #[test]
    fn missing_program_is_a_synthesis_error() {
        let dir = tempfile::tempdir().unwrap();
        let tts = EdgeTtsCommand::default().with_program("/no/such/edge-tts");
        let err = tts
            .synthesize("hello", &dir.path().join("out.mp3"))
            .unwrap_err();
        assert!(matches!(err, ClipforgeError::Synthesis(_)));
    }
}
