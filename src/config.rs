use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder in catalog entries that stands in for the running user's
/// profile directory. Resolution happens here, in the config layer; a path
/// that still carries the token when it reaches the engine is a caller bug.
pub const PROFILE_TOKEN: &str = "%USERPROFILE%";

/// The static catalog of sweep targets, grouped the way the cleanup
/// categories are presented to the user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetCatalog {
    #[serde(default)]
    pub temp: Vec<String>,
    #[serde(default)]
    pub system: Vec<String>,
    #[serde(default)]
    pub program_data: Vec<String>,
    #[serde(default)]
    pub user: Vec<String>,
    #[serde(default)]
    pub roaming: Vec<String>,
    #[serde(default)]
    pub local: Vec<String>,
    #[serde(default)]
    pub local_low: Vec<String>,
    #[serde(default)]
    pub browser: Vec<String>,
}

impl Default for TargetCatalog {
    fn default() -> Self {
        Self {
            temp: vec![format!("{PROFILE_TOKEN}/AppData/Local/Temp")],
            system: vec!["C:/Windows/Temp".into(), "C:/Windows/Prefetch".into()],
            program_data: vec![
                "C:/ProgramData/Microsoft/Windows/WER/ReportQueue".into(),
                "C:/ProgramData/Microsoft/Windows/WER/ReportArchive".into(),
            ],
            user: vec![format!("{PROFILE_TOKEN}/Recent")],
            roaming: vec![format!(
                "{PROFILE_TOKEN}/AppData/Roaming/Microsoft/Windows/Recent"
            )],
            local: vec![
                format!("{PROFILE_TOKEN}/AppData/Local/Microsoft/Windows/INetCache"),
                format!("{PROFILE_TOKEN}/AppData/Local/CrashDumps"),
            ],
            local_low: vec![format!("{PROFILE_TOKEN}/AppData/LocalLow/Temp")],
            browser: vec![
                format!("{PROFILE_TOKEN}/AppData/Local/Google/Chrome/User Data/Default/Cache"),
                format!("{PROFILE_TOKEN}/AppData/Local/Microsoft/Edge/User Data/Default/Cache"),
                format!("{PROFILE_TOKEN}/AppData/Local/Mozilla/Firefox/Profiles"),
            ],
        }
    }
}

impl TargetCatalog {
    pub const GROUP_NAMES: [&'static str; 8] = [
        "temp",
        "system",
        "program_data",
        "user",
        "roaming",
        "local",
        "local_low",
        "browser",
    ];

    pub fn group(&self, name: &str) -> Option<&[String]> {
        match name {
            "temp" => Some(&self.temp),
            "system" => Some(&self.system),
            "program_data" => Some(&self.program_data),
            "user" => Some(&self.user),
            "roaming" => Some(&self.roaming),
            "local" => Some(&self.local),
            "local_low" => Some(&self.local_low),
            "browser" => Some(&self.browser),
            _ => None,
        }
    }

    /// Every entry across every group, in catalog order.
    pub fn all(&self) -> Vec<String> {
        Self::GROUP_NAMES
            .iter()
            .filter_map(|name| self.group(name))
            .flat_map(|paths| paths.iter().cloned())
            .collect()
    }
}

/// Expands the profile placeholder in raw catalog entries against the
/// running user's actual profile path.
pub fn resolve_profile(raw: &[String], profile: &Path) -> Vec<PathBuf> {
    let profile = profile.to_string_lossy();
    raw.iter()
        .map(|entry| PathBuf::from(entry.replace(PROFILE_TOKEN, &profile)))
        .collect()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
    #[serde(default)]
    pub targets: TargetCatalog,
}

fn default_progress_buffer() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            progress_buffer: default_progress_buffer(),
            targets: TargetCatalog::default(),
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        let home_dir = dirs::home_dir().expect("Could not determine home directory");
        let reclaim_dir = home_dir.join(".reclaim");
        let config_path = reclaim_dir.join("config.toml");

        if config_path.exists() {
            let contents = tokio::fs::read_to_string(&config_path).await?;
            Ok(toml::from_str(&contents)?)
        } else {
            // Create default config
            let config = Self::default();
            tokio::fs::create_dir_all(&reclaim_dir).await?;
            let contents = toml::to_string_pretty(&config)?;
            tokio::fs::write(&config_path, contents).await?;
            Ok(config)
        }
    }
}
