//! End-to-end tests for the `backstroke` binary.
//!
//! None of these reach the network: tokens are cleared and every link
//! either skips or fails during planning.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// A command isolated from the caller's config and tokens.
fn backstroke(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("backstroke").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("xdg"))
        .env_remove("BACKSTROKE_CONFIG")
        .env_remove("GITHUB_TOKEN")
        .env_remove("BACKSTROKE_BOT_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

fn write_link(home: &TempDir, json: &str) -> std::path::PathBuf {
    let file = home.child("link.json");
    file.write_str(json).unwrap();
    file.path().to_path_buf()
}

mod help {
    use super::*;

    #[test]
    fn lists_commands() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("run"))
            .stdout(predicate::str::contains("opt-out"))
            .stdout(predicate::str::contains("completion"));
    }

    #[test]
    fn run_help_shows_link_format() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("fork-all"));
    }

    #[test]
    fn completion_bash() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["completion", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("backstroke"));
    }

    #[test]
    fn page_size_out_of_range_rejected() {
        let home = TempDir::new().unwrap();
        let link = write_link(&home, r#"{"enabled": false}"#);
        backstroke(&home)
            .args(["run", "--page-size", "101", "--link"])
            .arg(&link)
            .assert()
            .failure();
    }
}

mod config {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("source: (defaults)"))
            .stdout(predicate::str::contains("GITHUB_TOKEN (not set)"));
    }

    #[test]
    fn file_from_env_as_json() {
        let home = TempDir::new().unwrap();
        let file = home.child("config.toml");
        file.write_str(
            "[bot]\nlogin = \"sync-bot\"\n\n[sync]\npage_size = 50\nconcurrency = 4\n",
        )
        .unwrap();

        let output = backstroke(&home)
            .env("BACKSTROKE_CONFIG", file.path())
            .env("GITHUB_TOKEN", "secret-value")
            .args(["config", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let stdout = String::from_utf8(output.stdout).unwrap();
        assert!(!stdout.contains("secret-value"));
        let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(json["bot_login"], "sync-bot");
        assert_eq!(json["page_size"], 50);
        assert_eq!(json["concurrency"], 4);
        assert_eq!(json["github_token_set"], true);
    }

    #[test]
    fn invalid_file_fails() {
        let home = TempDir::new().unwrap();
        let file = home.child("config.toml");
        file.write_str("[sync]\npage_size = 500\n").unwrap();

        backstroke(&home)
            .env("BACKSTROKE_CONFIG", file.path())
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("page_size"));
    }
}

mod run {
    use super::*;

    #[test]
    fn disabled_link_is_skipped() {
        let home = TempDir::new().unwrap();
        let link = write_link(
            &home,
            r#"{
                "enabled": false,
                "from": {"type": "repo", "provider": "github", "name": "up/stream", "branch": "master"},
                "to": {"type": "fork-all", "provider": "github"}
            }"#,
        );

        let output = backstroke(&home)
            .args(["run", "--json", "--link"])
            .arg(&link)
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["error"], "not-enabled");
        assert_eq!(json["isEnabled"], false);
    }

    #[test]
    fn missing_endpoint_is_skipped() {
        let home = TempDir::new().unwrap();
        let link = write_link(
            &home,
            r#"{"enabled": true, "to": {"type": "fork-all", "provider": "github"}}"#,
        );

        backstroke(&home)
            .args(["run", "--link"])
            .arg(&link)
            .assert()
            .success()
            .stdout(predicate::str::contains("skipped"))
            .stdout(predicate::str::contains("missing: from"));
    }

    #[test]
    fn link_from_stdin() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["run", "--json", "--link", "-"])
            .write_stdin(r#"{"enabled": false}"#)
            .assert()
            .success()
            .stdout(predicate::str::contains("not-enabled"));
    }

    #[test]
    fn unsupported_target_type_exits_with_configuration_code() {
        let home = TempDir::new().unwrap();
        let link = write_link(
            &home,
            r#"{
                "enabled": true,
                "from": {"type": "repo", "provider": "github", "name": "up/stream", "branch": "master"},
                "to": {"type": "mirror", "provider": "github"}
            }"#,
        );

        backstroke(&home)
            .args(["run", "--link"])
            .arg(&link)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("mirror"));
    }

    #[test]
    fn malformed_link_fails() {
        let home = TempDir::new().unwrap();
        let link = write_link(&home, "{ not json");

        backstroke(&home)
            .args(["run", "--link"])
            .arg(&link)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Failed to parse link"));
    }

    #[test]
    fn missing_link_file_fails() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["run", "--link"])
            .arg(home.path().join("absent.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read link file"));
    }
}

mod opt_out {
    use super::*;

    #[test]
    fn rejects_malformed_repository() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["opt-out", "not-a-repo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("OWNER/REPO"));
    }

    #[test]
    fn unsupported_provider_is_configuration_error() {
        let home = TempDir::new().unwrap();
        backstroke(&home)
            .args(["opt-out", "alice/stream", "--provider", "gitlab"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains(
                "unsupported provider 'gitlab' (recognized but not implemented",
            ));
    }
}
