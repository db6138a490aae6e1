//! Path resolution for manifest targets.
//!
//! Restore targets in a manifest are written portably: environment
//! variables (`$EDITOR_HOME`, `${XDG_CONFIG_HOME}`), a home tilde
//! (`~/.gitconfig`), and logical tokens (`{home}`, `{config}`,
//! `{appdata}`, `{localappdata}`) that map to platform-correct roots.
//! This module expands all of those into absolute paths, and provides
//! the backup-safe normalisation used to lay targets out under a
//! per-run backup root without collisions.

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::{Error, Result};

/// Get the user's home directory.
///
/// Prefers the HOME environment variable over dirs::home_dir() so that
/// container setups and tests that override HOME behave consistently
/// with shell scripts that use `$HOME`.
pub fn home_dir() -> Result<Utf8PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(Utf8PathBuf::from(home));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| Error::invalid_manifest("Could not determine home directory"))?;
    Utf8PathBuf::from_path_buf(home).map_err(|p| Error::non_utf8_path(p.to_string_lossy()))
}

/// Roaming application-data root (`%APPDATA%` on Windows, the XDG config
/// directory elsewhere).
pub fn appdata_dir() -> Result<Utf8PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::invalid_manifest("Could not determine app-data directory"))?;
    Utf8PathBuf::from_path_buf(dir).map_err(|p| Error::non_utf8_path(p.to_string_lossy()))
}

/// Local (non-roaming) application-data root.
pub fn local_appdata_dir() -> Result<Utf8PathBuf> {
    let dir = dirs::data_local_dir()
        .ok_or_else(|| Error::invalid_manifest("Could not determine local app-data directory"))?;
    Utf8PathBuf::from_path_buf(dir).map_err(|p| Error::non_utf8_path(p.to_string_lossy()))
}

/// Expand logical tokens, environment variables, and a leading tilde.
///
/// Relative results are resolved against `base`. Undefined environment
/// variables are an error rather than expanding to an empty segment:
/// silently collapsing `$FOO/bar` to `/bar` would restore files to the
/// wrong place.
pub fn expand(input: &str, base: &Utf8Path) -> Result<Utf8PathBuf> {
    let mut s = input.to_string();

    // Logical tokens first: they may themselves contain env-style text
    if s.contains('{') {
        s = s.replace("{home}", home_dir()?.as_str());
        s = s.replace("{appdata}", appdata_dir()?.as_str());
        s = s.replace("{localappdata}", local_appdata_dir()?.as_str());
        s = s.replace("{config}", appdata_dir()?.as_str());
    }

    if s == "~" {
        s = home_dir()?.into_string();
    } else if let Some(rest) = s.strip_prefix("~/") {
        s = format!("{}/{}", home_dir()?, rest);
    }

    s = expand_env_vars(&s)?;

    let path = Utf8PathBuf::from(normalize_separators(&s));
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(base.join(path))
    }
}

/// Expand `$NAME` and `${NAME}` references against the process environment.
fn expand_env_vars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&n) = chars.peek() {
            let valid = if braced {
                n != '}'
            } else {
                n.is_ascii_alphanumeric() || n == '_'
            };
            if !valid {
                break;
            }
            name.push(n);
            chars.next();
        }
        if braced {
            // Consume the closing brace
            chars.next();
        }

        if name.is_empty() {
            out.push('$');
            continue;
        }

        match std::env::var(&name) {
            Ok(value) => out.push_str(&value),
            Err(_) => return Err(Error::UndefinedVariable { name }),
        }
    }

    Ok(out)
}

/// Normalise backslash separators to forward slashes.
///
/// Manifests authored on one platform are restored on another; globs and
/// derived ids must not depend on the authoring platform's separator.
pub fn normalize_separators(input: &str) -> String {
    input.replace('\\', "/")
}

/// Normalise a path into a backup-safe relative form.
///
/// Drive letters lose their colon (`C:` becomes `C_`), leading
/// separators are stripped, and separators are forward slashes, so
/// backups of `/etc/hosts` and `C:\etc\hosts` land in distinct,
/// collision-free subtrees of the backup root.
pub fn backup_safe(path: &Utf8Path) -> Utf8PathBuf {
    let mut s = normalize_separators(path.as_str());
    s = s.replace(':', "_");
    let trimmed = s.trim_start_matches('/');
    Utf8PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn tilde_expands_to_home() {
        std::env::set_var("HOME", "/home/tester");
        let p = expand("~/.gitconfig", Utf8Path::new("/base")).unwrap();
        assert_eq!(p, Utf8PathBuf::from("/home/tester/.gitconfig"));
    }

    #[test]
    #[serial]
    fn home_token_expands() {
        std::env::set_var("HOME", "/home/tester");
        let p = expand("{home}/.config/app", Utf8Path::new("/base")).unwrap();
        assert_eq!(p, Utf8PathBuf::from("/home/tester/.config/app"));
    }

    #[test]
    #[serial]
    fn env_vars_expand_in_both_styles() {
        std::env::set_var("RIGUP_TEST_ROOT", "/opt/apps");
        let p = expand("$RIGUP_TEST_ROOT/tool", Utf8Path::new("/base")).unwrap();
        assert_eq!(p, Utf8PathBuf::from("/opt/apps/tool"));
        let p = expand("${RIGUP_TEST_ROOT}/tool", Utf8Path::new("/base")).unwrap();
        assert_eq!(p, Utf8PathBuf::from("/opt/apps/tool"));
    }

    #[test]
    fn undefined_env_var_is_an_error() {
        let result = expand("$RIGUP_DOES_NOT_EXIST/x", Utf8Path::new("/base"));
        assert!(matches!(
            result,
            Err(Error::UndefinedVariable { name }) if name == "RIGUP_DOES_NOT_EXIST"
        ));
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let p = expand("configs/app.json", Utf8Path::new("/manifests/dev")).unwrap();
        assert_eq!(p, Utf8PathBuf::from("/manifests/dev/configs/app.json"));
    }

    #[test]
    fn backup_safe_strips_drive_and_leading_separators() {
        assert_eq!(
            backup_safe(Utf8Path::new("C:\\Users\\dev\\app.ini")),
            Utf8PathBuf::from("C_/Users/dev/app.ini")
        );
        assert_eq!(
            backup_safe(Utf8Path::new("/etc/hosts")),
            Utf8PathBuf::from("etc/hosts")
        );
    }

    #[test]
    fn backup_safe_forms_do_not_collide() {
        let a = backup_safe(Utf8Path::new("C:/data/f.txt"));
        let b = backup_safe(Utf8Path::new("/data/f.txt"));
        assert_ne!(a, b);
    }
}
