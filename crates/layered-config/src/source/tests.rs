use std::io::Write as _;

use assert_matches::assert_matches;

use super::*;
use crate::{testing::MockEnvGuard, ConfigError};

#[test]
fn dict_lookups_are_case_insensitive() {
    let source = Dict::new([("db_port", "5432"), ("HOST", "localhost")]);
    assert_eq!(source.get("port", &["db".to_owned()]).unwrap(), "5432");
    assert_eq!(source.get("Host", &[]).unwrap(), "localhost");
    assert_eq!(source.get("port", &[]), None);
}

#[test]
fn os_env_reads_mocked_vars() {
    let _guard = MockEnvGuard::new([("APP_PORT", "8000")]);
    assert_eq!(OsEnv.get("port", &["app".to_owned()]).unwrap(), "8000");
    assert_eq!(OsEnv.get("missing_for_sure", &["app".to_owned()]), None);
}

#[test]
fn env_file_loads_first_existing_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "# local overrides").unwrap();
    writeln!(file, "debug=true").unwrap();
    writeln!(file, "DB_PORT='5433'").unwrap();
    drop(file);

    let missing = dir.path().join(".env.missing");
    let source = EnvFile::new([&missing, &path]).unwrap();
    assert_eq!(source.path().unwrap(), path);
    assert_eq!(source.get("debug", &[]).unwrap(), "true");
    assert_eq!(source.get("port", &["db".to_owned()]).unwrap(), "5433");
}

#[test]
fn env_file_with_no_candidates_is_empty() {
    let source = EnvFile::new(["/definitely/does/not/exist/.env"]).unwrap();
    assert_eq!(source.path(), None);
    assert_eq!(source.get("anything", &[]), None);
}

#[test]
fn env_file_surfaces_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, "NOT A VAR LINE\n").unwrap();

    let err = EnvFile::new([&path]).unwrap_err();
    assert_matches!(&err, ConfigError::Other(msg) if msg.contains("line 1"));
}

#[test]
fn yaml_flattening() {
    let source = Yaml::from_str(
        "test.yaml",
        "host: localhost\ndb:\n  port: 5432\n  replica:\n    enabled: true\nunset: null\n",
    )
    .unwrap();

    assert_eq!(source.get("host", &[]).unwrap(), "localhost");
    assert_eq!(source.get("port", &["db".to_owned()]).unwrap(), "5432");
    assert_eq!(
        source
            .get("enabled", &["db".to_owned(), "replica".to_owned()])
            .unwrap(),
        "true"
    );
    assert_eq!(source.get("unset", &[]), None);
}

#[test]
fn yaml_rejects_sequences() {
    let err = Yaml::from_str("test.yaml", "db:\n  ports: [5432, 5433]\n").unwrap_err();
    assert!(format!("{err:#}").contains("db.ports"), "{err:#}");
}

#[test]
fn json_flattening() {
    let source = Json::from_str(
        "test.json",
        r#"{"host": "localhost", "db": {"port": 5432, "debug": false}, "unset": null}"#,
    )
    .unwrap();

    assert_eq!(source.get("host", &[]).unwrap(), "localhost");
    assert_eq!(source.get("port", &["db".to_owned()]).unwrap(), "5432");
    assert_eq!(source.get("debug", &["db".to_owned()]).unwrap(), "false");
    assert_eq!(source.get("unset", &[]), None);
}

#[test]
fn json_rejects_arrays() {
    let err = Json::from_str("test.json", r#"{"ports": [1, 2]}"#).unwrap_err();
    assert!(format!("{err:#}").contains("ports"), "{err:#}");
}
