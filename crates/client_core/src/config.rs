use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::warn;

pub const SETTINGS_FILE: &str = "console.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub session_file: Option<PathBuf>,
    pub page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080/api".into(),
            request_timeout_secs: 15,
            session_file: None,
            page_size: 10,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, Path::new(SETTINGS_FILE));
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Layers a flat `key = value` TOML file over `settings`. A missing or
/// unparsable file leaves the settings untouched.
pub fn apply_file_overrides(settings: &mut Settings, path: &Path) {
    let Ok(raw) = fs::read_to_string(path) else {
        return;
    };
    let table = match raw.parse::<toml::Table>() {
        Ok(table) => table,
        Err(err) => {
            warn!("config: ignoring unparsable {}: {err}", path.display());
            return;
        }
    };

    if let Some(v) = table.get("api_base_url").and_then(|v| v.as_str()) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = table.get("request_timeout_secs").and_then(|v| v.as_integer()) {
        if let Ok(v) = u64::try_from(v) {
            settings.request_timeout_secs = v;
        }
    }
    if let Some(v) = table.get("session_file").and_then(|v| v.as_str()) {
        settings.session_file = Some(PathBuf::from(v));
    }
    if let Some(v) = table.get("page_size").and_then(|v| v.as_integer()) {
        if let Ok(v) = usize::try_from(v) {
            if v > 0 {
                settings.page_size = v;
            }
        }
    }
}

pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("CONSOLE_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = lookup("APP__SESSION_FILE") {
        settings.session_file = Some(PathBuf::from(v));
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.parse::<usize>() {
            if parsed > 0 {
                settings.page_size = parsed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("console.toml");
        fs::write(
            &path,
            "api_base_url = \"https://admin.example.com/api\"\nrequest_timeout_secs = 30\npage_size = 25\n",
        )
        .expect("write");

        let mut settings = Settings::default();
        apply_file_overrides(&mut settings, &path);

        assert_eq!(settings.api_base_url, "https://admin.example.com/api");
        assert_eq!(settings.request_timeout_secs, 30);
        assert_eq!(settings.page_size, 25);
        assert!(settings.session_file.is_none());
    }

    #[test]
    fn missing_or_broken_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut settings = Settings::default();
        apply_file_overrides(&mut settings, &dir.path().join("absent.toml"));
        assert_eq!(settings, Settings::default());

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "api_base_url = ").expect("write");
        apply_file_overrides(&mut settings, &broken);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn prefixed_env_wins_over_plain_env() {
        let mut settings = Settings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("CONSOLE_API_URL", "http://plain/api"),
                ("APP__API_URL", "http://prefixed/api"),
                ("APP__SESSION_FILE", "/tmp/session.json"),
            ]),
        );
        assert_eq!(settings.api_base_url, "http://prefixed/api");
        assert_eq!(settings.session_file, Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn invalid_numeric_env_values_are_ignored() {
        let mut settings = Settings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("APP__REQUEST_TIMEOUT_SECS", "soon"),
                ("APP__PAGE_SIZE", "0"),
            ]),
        );
        assert_eq!(settings.request_timeout_secs, 15);
        assert_eq!(settings.page_size, 10);
    }

    #[test]
    fn timeout_is_never_zero() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }
}
