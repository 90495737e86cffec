use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::DaemonError;

/// One trackable application from the database. Aliases are lowercased at
/// load time so lookups are case-insensitive. Immutable after load.
#[derive(Debug, Clone)]
pub struct App {
    pub exe: Vec<String>,
    pub title: String,
    pub icon: Option<String>,
}

/// On-disk entry shape. `exe` accepts a single basename or a list of them.
#[derive(Deserialize)]
struct RawApp {
    exe: ExeField,
    title: String,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExeField {
    One(String),
    Many(Vec<String>),
}

/// Immutable index of known applications, loaded once at startup from a
/// JSON array of `{exe, title, icon?}` records.
pub struct AppCatalog {
    apps: Vec<App>,
}

impl AppCatalog {
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path).map_err(|source| DaemonError::DatabaseRead {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Vec<RawApp> =
            serde_json::from_str(&content).map_err(|source| DaemonError::DatabaseMalformed {
                path: path.to_path_buf(),
                source,
            })?;

        let apps: Vec<App> = raw
            .into_iter()
            .map(|r| App {
                exe: match r.exe {
                    ExeField::One(exe) => vec![exe.to_lowercase()],
                    ExeField::Many(exes) => exes.into_iter().map(|e| e.to_lowercase()).collect(),
                },
                title: r.title,
                icon: r.icon,
            })
            .collect();

        info!("loaded {} apps from database", apps.len());
        Ok(Self { apps })
    }

    /// Linear scan over every alias of every entry; first hit wins. The
    /// returned index is the entry's identity key. An empty catalog simply
    /// never matches.
    pub fn lookup(&self, basename: &str) -> Option<(usize, &App)> {
        let needle = basename.to_lowercase();
        self.apps
            .iter()
            .enumerate()
            .find(|(_, app)| app.exe.iter().any(|exe| *exe == needle))
    }

    /// Test constructor. Aliases must already be lowercase, as `load`
    /// would have left them.
    #[cfg(test)]
    pub(crate) fn from_apps(apps: Vec<App>) -> Self {
        Self { apps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_db(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    // ── load ──────────────────────────────────────────────────────────────────

    #[test]
    fn load_parses_list_and_string_exe_forms() {
        let (_dir, path) = write_db(
            r#"[
                {"exe": ["Game.exe", "game-launcher.exe"], "title": "Game", "icon": "game_icon"},
                {"exe": "Solo.exe", "title": "Solo"}
            ]"#,
        );
        let catalog = AppCatalog::load(&path).unwrap();

        let (_, game) = catalog.lookup("game.exe").unwrap();
        assert_eq!(game.title, "Game");
        assert_eq!(game.icon.as_deref(), Some("game_icon"));

        let (_, solo) = catalog.lookup("solo.exe").unwrap();
        assert_eq!(solo.title, "Solo");
        assert!(solo.icon.is_none());
    }

    #[test]
    fn load_lowercases_aliases() {
        let (_dir, path) = write_db(r#"[{"exe": ["MiXeD.ExE"], "title": "Mixed"}]"#);
        let catalog = AppCatalog::load(&path).unwrap();
        let (_, app) = catalog.lookup("mixed.exe").unwrap();
        assert_eq!(app.exe, vec!["mixed.exe"]);
    }

    #[test]
    fn load_empty_catalog_is_valid() {
        let (_dir, path) = write_db("[]");
        let catalog = AppCatalog::load(&path).unwrap();
        assert!(catalog.lookup("anything.exe").is_none());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppCatalog::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(DaemonError::DatabaseRead { .. })));
    }

    #[test]
    fn load_malformed_json_fails() {
        let (_dir, path) = write_db("{not json[");
        let result = AppCatalog::load(&path);
        assert!(matches!(result, Err(DaemonError::DatabaseMalformed { .. })));
    }

    // ── lookup ────────────────────────────────────────────────────────────────

    #[test]
    fn lookup_is_case_insensitive() {
        let (_dir, path) = write_db(r#"[{"exe": ["game.exe"], "title": "Game"}]"#);
        let catalog = AppCatalog::load(&path).unwrap();
        assert!(catalog.lookup("GAME.EXE").is_some());
        assert!(catalog.lookup("Game.Exe").is_some());
    }

    #[test]
    fn lookup_first_match_wins_across_duplicate_aliases() {
        let (_dir, path) = write_db(
            r#"[
                {"exe": ["shared.exe"], "title": "First"},
                {"exe": ["shared.exe"], "title": "Second"}
            ]"#,
        );
        let catalog = AppCatalog::load(&path).unwrap();
        let (entry, app) = catalog.lookup("shared.exe").unwrap();
        assert_eq!(entry, 0);
        assert_eq!(app.title, "First");
    }

    #[test]
    fn lookup_unknown_basename_returns_none() {
        let (_dir, path) = write_db(r#"[{"exe": ["game.exe"], "title": "Game"}]"#);
        let catalog = AppCatalog::load(&path).unwrap();
        assert!(catalog.lookup("other.exe").is_none());
    }

    #[test]
    fn lookup_matches_any_alias_of_an_entry() {
        let (_dir, path) = write_db(r#"[{"exe": ["a.exe", "b.exe"], "title": "AB"}]"#);
        let catalog = AppCatalog::load(&path).unwrap();
        assert_eq!(catalog.lookup("a.exe").unwrap().0, 0);
        assert_eq!(catalog.lookup("b.exe").unwrap().0, 0);
    }
}
