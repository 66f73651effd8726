//! Emulator status parsing
//!
//! `GET /status` is best-effort: newer emulator builds answer with JSON,
//! older ones with a plaintext dump. Both are accepted; unknown shapes yield
//! a status with both flags false rather than an error.

use serde::Serialize;
use serde_json::Value;

/// What the emulator reports about itself
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EmulatorStatus {
    /// Emulation is running (not paused)
    pub running: bool,
    /// A ROM is loaded
    pub rom_loaded: bool,
    /// Parsed JSON body, when the body was JSON
    pub raw: Option<Value>,
}

impl EmulatorStatus {
    /// True when memory reads will hit live game RAM
    pub fn is_ready(&self) -> bool {
        self.running && self.rom_loaded
    }
}

/// Parse a status body, JSON first then plaintext
pub fn parse_status(body: &str) -> EmulatorStatus {
    let body = body.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match serde_json::from_str::<Value>(body) {
        Ok(value @ Value::Object(_)) => from_json(value),
        _ => from_plaintext(body),
    }
}

fn from_json(value: Value) -> EmulatorStatus {
    let running = match value.get("running").or_else(|| value.get("mode")) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("run") || s.eq_ignore_ascii_case("running"),
        _ => false,
    };
    let rom_loaded = value
        .get("rom_loaded")
        .or_else(|| value.get("romLoaded"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    EmulatorStatus {
        running,
        rom_loaded,
        raw: Some(value),
    }
}

fn from_plaintext(body: &str) -> EmulatorStatus {
    EmulatorStatus {
        running: body.contains("MODE: RUN"),
        rom_loaded: body.contains("ROM Loaded: true"),
        raw: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_string() {
        let status = parse_status(r#"{"mode": "RUN", "rom_loaded": true}"#);
        assert!(status.running);
        assert!(status.rom_loaded);
        assert!(status.is_ready());
        assert!(status.raw.is_some());
    }

    #[test]
    fn test_json_camel_case_and_bool() {
        let status = parse_status(r#"{"running": true, "romLoaded": false}"#);
        assert!(status.running);
        assert!(!status.rom_loaded);
        assert!(!status.is_ready());
    }

    #[test]
    fn test_json_paused() {
        let status = parse_status(r#"{"mode": "PAUSE", "rom_loaded": true}"#);
        assert!(!status.running);
        assert!(status.rom_loaded);
    }

    #[test]
    fn test_plaintext_fallback() {
        let body = "GBA Debug Server\nMODE: RUN\nROM Loaded: true\nFPS: 60\n";
        let status = parse_status(body);
        assert!(status.running);
        assert!(status.rom_loaded);
        assert!(status.raw.is_none());
    }

    #[test]
    fn test_plaintext_not_loaded() {
        let status = parse_status("MODE: PAUSE\nROM Loaded: false");
        assert!(!status.running);
        assert!(!status.rom_loaded);
    }

    #[test]
    fn test_garbage_and_non_object_json() {
        assert_eq!(parse_status(""), EmulatorStatus::default());
        assert_eq!(parse_status("\0\0 "), EmulatorStatus::default());
        // A bare JSON scalar goes through the plaintext path
        let status = parse_status("true");
        assert!(!status.running);
        assert!(status.raw.is_none());
    }
}
