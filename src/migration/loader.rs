//! Script discovery
//!
//! The repository is built from whatever a [`ScriptLoader`] returns. Two
//! loaders ship with the crate: [`StaticLoader`] for scripts defined in Rust
//! and [`DirectoryLoader`] for a directory of `.sql` revision files.
//!
//! # Revision file format
//!
//! ```sql
//! -- revision: 3f1c9a0d2b7e
//! -- revises: 9e8d7c6b5a41
//! -- description: create profiles table
//!
//! -- migrate:up
//! CREATE TABLE {schema}.profiles (user_id TEXT PRIMARY KEY);
//!
//! -- migrate:down
//! DROP TABLE {schema}.profiles;
//! ```
//!
//! An empty or missing `revises` header marks the base revision.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::script::{MigrationScript, SqlScript};
use crate::error::{MigrationError, MigrationResult};

/// Source of migration scripts
pub trait ScriptLoader {
    fn load(&self) -> MigrationResult<Vec<Box<dyn MigrationScript>>>;
}

/// Loader over scripts that were constructed in code
///
/// The scripts are handed out once; a second `load` fails with `ScriptLoad`.
pub struct StaticLoader {
    scripts: Mutex<Option<Vec<Box<dyn MigrationScript>>>>,
}

impl StaticLoader {
    pub fn new(scripts: Vec<Box<dyn MigrationScript>>) -> Self {
        Self {
            scripts: Mutex::new(Some(scripts)),
        }
    }
}

impl ScriptLoader for StaticLoader {
    fn load(&self) -> MigrationResult<Vec<Box<dyn MigrationScript>>> {
        let mut scripts = self
            .scripts
            .lock()
            .map_err(|_| MigrationError::ScriptLoad {
                path: "<static>".to_string(),
                reason: "script list lock poisoned".to_string(),
            })?;
        scripts.take().ok_or_else(|| MigrationError::ScriptLoad {
            path: "<static>".to_string(),
            reason: "scripts already loaded".to_string(),
        })
    }
}

/// Loader reading every `*.sql` file in a directory
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn script_files(&self) -> MigrationResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| MigrationError::ScriptLoad {
            path: self.dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MigrationError::ScriptLoad {
                path: self.dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl ScriptLoader for DirectoryLoader {
    fn load(&self) -> MigrationResult<Vec<Box<dyn MigrationScript>>> {
        let mut scripts: Vec<Box<dyn MigrationScript>> = Vec::new();
        for path in self.script_files()? {
            let content =
                std::fs::read_to_string(&path).map_err(|e| MigrationError::ScriptLoad {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            let script = parse_sql_script(&content).map_err(|reason| MigrationError::ScriptLoad {
                path: path.display().to_string(),
                reason,
            })?;
            debug!(
                "loaded revision {} from {}",
                script.revision.as_str(),
                path.display()
            );
            scripts.push(Box::new(script));
        }
        Ok(scripts)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Up,
    Down,
}

/// Parse the content of one revision file
pub fn parse_sql_script(content: &str) -> Result<SqlScript, String> {
    let mut revision: Option<String> = None;
    let mut parent: Option<String> = None;
    let mut description = String::new();
    let mut up: Option<String> = None;
    let mut down: Option<String> = None;
    let mut section = Section::Header;

    for line in content.lines() {
        let trimmed = line.trim();
        match trimmed {
            "-- migrate:up" => {
                if up.is_some() {
                    return Err("duplicate '-- migrate:up' section".to_string());
                }
                section = Section::Up;
                up = Some(String::new());
                continue;
            }
            "-- migrate:down" => {
                if down.is_some() {
                    return Err("duplicate '-- migrate:down' section".to_string());
                }
                section = Section::Down;
                down = Some(String::new());
                continue;
            }
            _ => {}
        }

        match section {
            Section::Header => {
                let Some(header) = trimmed.strip_prefix("--") else {
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Err(format!("unexpected statement before any section: {}", trimmed));
                };
                let Some((key, value)) = header.split_once(':') else {
                    continue;
                };
                let value = value.trim();
                match key.trim().to_lowercase().as_str() {
                    "revision" => revision = Some(value.to_string()),
                    "revises" => {
                        parent = match value {
                            "" | "base" => None,
                            v => Some(v.to_string()),
                        }
                    }
                    "description" => description = value.to_string(),
                    _ => {}
                }
            }
            Section::Up => push_line(&mut up, line),
            Section::Down => push_line(&mut down, line),
        }
    }

    let revision = match revision {
        Some(r) if !r.is_empty() => r,
        _ => return Err("missing '-- revision:' header".to_string()),
    };
    let up = up.ok_or_else(|| "missing '-- migrate:up' section".to_string())?;
    let down = down.ok_or_else(|| "missing '-- migrate:down' section".to_string())?;

    Ok(SqlScript {
        revision,
        parent,
        description,
        up: up.trim().to_string(),
        down: down.trim().to_string(),
    })
}

fn push_line(buf: &mut Option<String>, line: &str) {
    if let Some(buf) = buf {
        buf.push_str(line);
        buf.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::FnScript;

    const PROFILES: &str = r#"
-- revision: b7c41e2a9d10
-- revises: 5d2f8c1a7e34
-- description: create profiles table

-- migrate:up
CREATE TABLE {schema}.profiles (
    user_id TEXT PRIMARY KEY
);

-- migrate:down
DROP TABLE {schema}.profiles;
"#;

    #[test]
    fn test_parse_sql_script() {
        let script = parse_sql_script(PROFILES).unwrap();
        assert_eq!(script.revision, "b7c41e2a9d10");
        assert_eq!(script.parent.as_deref(), Some("5d2f8c1a7e34"));
        assert_eq!(script.description, "create profiles table");
        assert!(script.up.starts_with("CREATE TABLE {schema}.profiles"));
        assert_eq!(script.down, "DROP TABLE {schema}.profiles;");
    }

    #[test]
    fn test_parse_base_revision() {
        let content = "-- revision: aaa\n-- revises:\n-- migrate:up\nSELECT 1;\n-- migrate:down\nSELECT 2;\n";
        let script = parse_sql_script(content).unwrap();
        assert_eq!(script.parent, None);

        let content = "-- revision: aaa\n-- migrate:up\n-- migrate:down\n";
        let script = parse_sql_script(content).unwrap();
        assert_eq!(script.parent, None);
        assert_eq!(script.up, "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_sql_script("-- migrate:up\nSELECT 1;\n-- migrate:down\n")
            .unwrap_err()
            .contains("revision"));
        assert!(parse_sql_script("-- revision: a\n-- migrate:up\nSELECT 1;\n")
            .unwrap_err()
            .contains("migrate:down"));
        assert!(parse_sql_script("-- revision: a\nSELECT 1;\n")
            .unwrap_err()
            .contains("before any section"));
        assert!(
            parse_sql_script("-- revision: a\n-- migrate:up\n-- migrate:up\n-- migrate:down\n")
                .unwrap_err()
                .contains("duplicate")
        );
    }

    #[test]
    fn test_directory_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("0002_profiles.sql"), PROFILES).unwrap();
        std::fs::write(
            dir.path().join("0001_rooms.sql"),
            "-- revision: 5d2f8c1a7e34\n-- migrate:up\nCREATE TABLE {schema}.rooms (id TEXT);\n-- migrate:down\nDROP TABLE {schema}.rooms;\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("README.md"), "not a script").unwrap();

        let scripts = DirectoryLoader::new(dir.path()).load().unwrap();
        let revisions: Vec<&str> = scripts.iter().map(|s| s.revision()).collect();
        assert_eq!(revisions, vec!["5d2f8c1a7e34", "b7c41e2a9d10"]);
    }

    #[test]
    fn test_directory_loader_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.sql"), "-- migrate:up\n").unwrap();

        match DirectoryLoader::new(dir.path()).load() {
            Err(MigrationError::ScriptLoad { path, .. }) => assert!(path.ends_with("broken.sql")),
            _ => panic!("expected ScriptLoad error"),
        }
    }

    #[test]
    fn test_directory_loader_missing_dir() {
        let result = DirectoryLoader::new("/nonexistent/schemaflow/migrations").load();
        assert!(matches!(result, Err(MigrationError::ScriptLoad { .. })));
    }

    #[test]
    fn test_bundled_migrations_round_trip() {
        use crate::database::DatabaseConn;
        use crate::migration::{EnvironmentContext, MigrationRunner, Target};

        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/migrations");
        let runner = MigrationRunner::from_loader(&DirectoryLoader::new(dir)).unwrap();
        assert_eq!(runner.repository().len(), 4);

        let db = DatabaseConn::open_in_memory().unwrap();
        db.attach_schema("connect", None).unwrap();
        let ctx = EnvironmentContext::new(&db.conn, "connect").unwrap();

        let report = runner.upgrade_to_head(&ctx).unwrap();
        assert_eq!(report.steps.len(), 4);

        db.conn
            .execute(
                r#"INSERT INTO "connect".people_conversations (members, creator, first_invitee)
                   VALUES ('["@zoe:host","@al:host"]', '@zoe:host', '@al:host')"#,
                [],
            )
            .unwrap();
        let members: String = db
            .conn
            .query_row(
                r#"SELECT members FROM "connect".people_conversations"#,
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(members, r#"["@al:host","@zoe:host"]"#);

        runner.downgrade_to(&ctx, &Target::Base).unwrap();
        assert_eq!(db.objects_in("connect").unwrap(), vec!["schema_version"]);
    }

    #[test]
    fn test_static_loader() {
        let loader = StaticLoader::new(vec![Box::new(FnScript::new("aaa", None))]);
        assert_eq!(loader.load().unwrap().len(), 1);
        match loader.load() {
            Err(MigrationError::ScriptLoad { path, reason }) => {
                assert_eq!(path, "<static>");
                assert!(reason.contains("already loaded"));
            }
            _ => panic!("expected ScriptLoad on second load"),
        }
    }

    #[test]
    fn test_static_loader_second_runner_fails() {
        use crate::migration::MigrationRunner;

        let loader = StaticLoader::new(vec![
            Box::new(FnScript::new("aaa", None)),
            Box::new(FnScript::new("bbb", Some("aaa"))),
        ]);
        let first = MigrationRunner::from_loader(&loader).unwrap();
        assert_eq!(first.repository().len(), 2);
        assert!(matches!(
            MigrationRunner::from_loader(&loader),
            Err(MigrationError::ScriptLoad { .. })
        ));
    }
}
