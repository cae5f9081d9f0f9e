//! Host OS identification for the update-check request.
//!
//! Reads `/etc/os-release` (or `/usr/lib/os-release`), falling back to a
//! scan of `/etc` for `*-release` files, and finally to a generic identity.
//! None of this is critical to updating; failures degrade to placeholder
//! values rather than erroring.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Command;
use tracing::debug;

/// OS and distribution identity sent with update checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsDistribution {
    /// Kernel release, e.g. "6.8.0".
    pub kernel_version: String,
    /// Machine-readable distribution id, e.g. "ubuntu".
    pub distribution_id: String,
    /// Distribution name, e.g. "Ubuntu".
    pub distribution: String,
    /// Distribution version id, e.g. "24.04".
    pub distribution_version: String,
    /// Pretty name, e.g. "Ubuntu 24.04.1 LTS".
    pub distribution_pretty_name: String,
}

impl OsDistribution {
    /// The identity sent when the user has opted out of stats.
    pub fn optout() -> Self {
        Self {
            kernel_version: "Linux Optout".into(),
            distribution_id: "optout".into(),
            distribution: "Optout".into(),
            distribution_version: "0.0".into(),
            distribution_pretty_name: "Optout".into(),
        }
    }
}

fn parse_os_release(contents: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in contents.lines() {
        if let Some((key, value)) = line.split_once('=') {
            fields.insert(key.trim().to_string(), value.trim().replace('"', ""));
        }
    }
    fields
}

fn release_fields_from_etc_scan() -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let release_re = Regex::new(r"release").expect("static regex");

    if let Ok(entries) = std::fs::read_dir("/etc") {
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) && release_re.is_match(&name)
            {
                // e.g. "arch-release" identifies the distribution by name.
                if let Some((id, _)) = name.split_once('-') {
                    let mut chars = id.chars();
                    let title = match chars.next() {
                        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                        None => continue,
                    };
                    fields.insert("ID".to_string(), title.clone());
                    fields.insert("NAME".to_string(), format!("{title} Linux"));
                    fields.insert("PRETTY_NAME".to_string(), format!("{title} Linux"));
                }
            }
        }
    }

    if fields.is_empty() {
        fields.insert("ID".to_string(), "Generic".to_string());
        fields.insert("NAME".to_string(), "Generic Linux".to_string());
        fields.insert("PRETTY_NAME".to_string(), "Generic Linux".to_string());
    }
    fields
}

fn kernel_version() -> String {
    match Command::new("uname").arg("-r").output() {
        Ok(output) => {
            let raw = String::from_utf8_lossy(&output.stdout);
            let trimmed = raw.trim();
            // "6.8.0-45-generic" reports as "6.8.0".
            trimmed.split('-').next().unwrap_or(trimmed).to_string()
        }
        Err(err) => {
            debug!("uname -r failed: {err}");
            "Unknown".to_string()
        }
    }
}

/// Probe the host for its distribution identity.
pub fn gather() -> OsDistribution {
    let fields = std::fs::read_to_string("/etc/os-release")
        .or_else(|_| std::fs::read_to_string("/usr/lib/os-release"))
        .map(|contents| parse_os_release(&contents))
        .unwrap_or_else(|_| release_fields_from_etc_scan());

    OsDistribution {
        kernel_version: kernel_version(),
        distribution_id: fields.get("ID").cloned().unwrap_or_default(),
        distribution: fields.get("NAME").cloned().unwrap_or_default(),
        distribution_version: fields.get("VERSION_ID").cloned().unwrap_or_default(),
        distribution_pretty_name: fields.get("PRETTY_NAME").cloned().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_os_release_fields() {
        let contents = r#"NAME="Ubuntu"
VERSION_ID="24.04"
ID=ubuntu
PRETTY_NAME="Ubuntu 24.04.1 LTS"
"#;
        let fields = parse_os_release(contents);
        assert_eq!(fields["NAME"], "Ubuntu");
        assert_eq!(fields["ID"], "ubuntu");
        assert_eq!(fields["VERSION_ID"], "24.04");
        assert_eq!(fields["PRETTY_NAME"], "Ubuntu 24.04.1 LTS");
    }

    #[test]
    fn optout_identity_is_stable() {
        let optout = OsDistribution::optout();
        assert_eq!(optout.distribution_id, "optout");
        assert_eq!(optout.distribution, "Optout");
    }

    #[test]
    fn gather_never_panics() {
        let os = gather();
        // Kernel probing may legitimately fall back to "Unknown" in
        // constrained environments, but the field is always populated.
        assert!(!os.kernel_version.is_empty());
    }
}
