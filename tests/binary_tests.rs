//! Integration tests for the crud-lineage binary.

use std::{fs, path::PathBuf};

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("crud-lineage");
    cmd.env_remove("CRUD_LINEAGE_DIALECT")
        .env_remove("CRUD_LINEAGE_MAX_DEPTH")
        .env_remove("CRUD_LINEAGE_WORKERS");
    cmd
}

struct Fixture {
    dir: TempDir
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("schema.sql"),
            "CREATE TABLE users (id INT PRIMARY KEY, name TEXT);\n\
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT, total INT);\n"
        )
        .unwrap();
        Self {
            dir
        }
    }

    fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }
}

#[test]
fn test_resolve_clean_exit() {
    let fx = Fixture::new();
    fx.file(
        "user.json",
        r#"{"namespace": "UserMapper", "statements": [
            {"id": "selectById", "sql": "SELECT id, name FROM users WHERE id = #{id}"}
        ]}"#
    );

    cmd()
        .current_dir(fx.dir.path())
        .args(["resolve", "-s", &fx.path("schema.sql"), "-q", &fx.path("user.json"), "--no-color"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("UserMapper.selectById (SELECT)"))
        .stdout(predicate::str::contains("users: id, name"));
}

#[test]
fn test_resolve_ambiguous_column_exit_one() {
    let fx = Fixture::new();
    fx.file(
        "order.yaml",
        "namespace: OrderMapper\nstatements:\n  - id: joined\n    sql: SELECT id FROM users u JOIN orders o ON o.user_id = u.id\n"
    );

    cmd()
        .current_dir(fx.dir.path())
        .args(["resolve", "-s", &fx.path("schema.sql"), "-q", &fx.path("order.yaml"), "--no-color"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("LIN005"));
}

#[test]
fn test_resolve_mapper_xml() {
    let fx = Fixture::new();
    fx.file(
        "UserMapper.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<mapper namespace="UserMapper">
  <sql id="cols">id, name</sql>
  <select id="selectById">
    SELECT <include refid="cols"/> FROM users
    <where><if test="id != null">AND id = #{id}</if></where>
  </select>
</mapper>"#
    );

    let output = cmd()
        .current_dir(fx.dir.path())
        .args(["resolve", "-s", &fx.path("schema.sql"), "-q", &fx.path("UserMapper.xml"), "-f", "json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = &value["statements"][0];
    assert_eq!(entry["declared"], "Read");
    assert_eq!(entry["statement"]["tables"][0], "users");
    assert_eq!(entry["statement"]["columns"]["users"], serde_json::json!(["id", "name"]));
}

#[test]
fn test_resolve_malformed_file_exit_two() {
    let fx = Fixture::new();
    fx.file("broken.json", "{ not json");
    fx.file(
        "good.json",
        r#"{"namespace": "M", "statements": [{"id": "a", "sql": "SELECT name FROM users"}]}"#
    );

    cmd()
        .current_dir(fx.dir.path())
        .args([
            "resolve",
            "-s",
            &fx.path("schema.sql"),
            "-q",
            &fx.path("broken.json"),
            &fx.path("good.json"),
            "-f",
            "json"
        ])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("MalformedInput"))
        .stdout(predicate::str::contains("\"users\""));
}

#[test]
fn test_lineage_json_output() {
    let fx = Fixture::new();
    fx.file(
        "user.json",
        r#"{"namespace": "UserMapper", "statements": [
            {"id": "selectById", "sql": "SELECT id, name FROM users WHERE id = #{id}"}
        ]}"#
    );
    fx.file(
        "dao.json",
        r#"[{"dao_class": "UserDao", "method": "getUserById",
             "statement": {"namespace": "UserMapper", "id": "selectById"}, "crud": "R"}]"#
    );
    fx.file(
        "logic.json",
        r#"[{"logic_class": "UserLogic", "logic_method": "fetchUserById",
             "invocations": ["userDao.getUserById(id)"]}]"#
    );

    let output = cmd()
        .current_dir(fx.dir.path())
        .args([
            "lineage",
            "-s",
            &fx.path("schema.sql"),
            "-q",
            &fx.path("user.json"),
            "-d",
            &fx.path("dao.json"),
            "-l",
            &fx.path("logic.json"),
            "-f",
            "json"
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["lineage"][0]["logic_method"], "fetchUserById");
    assert_eq!(value["lineage"][0]["crud"], "Read");
    assert_eq!(value["lineage"][0]["tables"][0], "users");
    assert_eq!(value["lineage"][0]["parameters"][0], "id");
}

#[test]
fn test_unknown_dialect_in_config_file() {
    let fx = Fixture::new();
    fx.file(".crud-lineage.toml", "[resolver]\ndialect = \"oracle\"\n");
    fx.file("m.json", r#"{"statements": []}"#);

    cmd()
        .current_dir(fx.dir.path())
        .args(["resolve", "-q", &fx.path("m.json")])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_required_args() {
    cmd().arg("resolve").assert().failure();
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lineage"));
}
