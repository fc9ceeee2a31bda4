use std::{env, path::PathBuf};

use dirs_next::home_dir;

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a tilde prefix are returned trimmed but otherwise untouched.
/// When the home directory cannot be determined the tilde is kept literally.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}

/// Reads a path override from `var`, ignoring unset or blank values.
pub fn path_from_env(var: &str) -> Option<PathBuf> {
    let value = env::var(var).ok()?;
    if value.trim().is_empty() {
        return None;
    }
    Some(expand_tilde(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_trimmed_only() {
        assert_eq!(expand_tilde("  config/apis.json "), PathBuf::from("config/apis.json"));
    }

    #[test]
    fn tilde_prefix_resolves_under_home() {
        let Some(home) = home_dir() else {
            return;
        };
        assert_eq!(expand_tilde("~/apis.json"), home.join("apis.json"));
        assert_eq!(expand_tilde("~"), home);
    }

    #[test]
    fn blank_env_override_is_ignored() {
        temp_env::with_var("AUTOMATION_TEST_PATH_OVERRIDE", Some("   "), || {
            assert!(path_from_env("AUTOMATION_TEST_PATH_OVERRIDE").is_none());
        });
        temp_env::with_var("AUTOMATION_TEST_PATH_OVERRIDE", Some("/tmp/apis.json"), || {
            assert_eq!(
                path_from_env("AUTOMATION_TEST_PATH_OVERRIDE"),
                Some(PathBuf::from("/tmp/apis.json"))
            );
        });
    }
}
