//! Integration tests for stagecache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated app root, archive root and config file
    struct Sandbox {
        dir: TempDir,
        config: PathBuf,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = dir.path().join("config.toml");
            let content = format!(
                "[general]\naudit_log = false\n\n[staging]\nroot = {:?}\narchive_root = {:?}\n",
                dir.path().join("app").display().to_string(),
                dir.path().join("archive").display().to_string(),
            );
            std::fs::write(&config, content).unwrap();
            Self { dir, config }
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("stagecache");
            cmd.env_remove("STAGECACHE_CONFIG")
                .env_remove("STAGECACHE_ROOT")
                .arg("--config")
                .arg(&self.config);
            cmd
        }

        fn source(&self, name: &str, content: &[u8]) -> PathBuf {
            let path = self.dir.path().join("src").join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, content).unwrap();
            path
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }
    }

    fn stdout_json(output: &[u8]) -> serde_json::Value {
        serde_json::from_slice(output).unwrap()
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("stagecache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Read-only staging cache"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("stagecache")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecache"));
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("stagecache")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("stagecache"));
    }

    #[test]
    fn config_path_uses_flag() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[staging]"))
            .stdout(predicate::str::contains("max_age_hours = 24"));
    }

    #[test]
    fn config_init_does_not_overwrite() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));

        let fresh = sandbox.path("fresh.toml");
        cargo_bin_cmd!("stagecache")
            .env_remove("STAGECACHE_CONFIG")
            .arg("--config")
            .arg(&fresh)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(fresh.exists());
    }

    #[test]
    fn config_set_persists() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "gc.max_age_hours", "6"])
            .assert()
            .success();

        let saved = std::fs::read_to_string(&sandbox.config).unwrap();
        assert!(saved.contains("max_age_hours = 6"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let sandbox = Sandbox::new();
        std::fs::write(&sandbox.config, "[gc]\nmax_age_hours = \"soon\"\n").unwrap();

        sandbox
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No sessions"));
    }

    #[test]
    fn stage_creates_ephemeral_session() {
        let sandbox = Sandbox::new();
        let source = sandbox.source("NC001.h", &[7u8; 500]);

        let output = sandbox
            .cmd()
            .arg("stage")
            .arg(&source)
            .args(["--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json = stdout_json(&output.stdout);
        let id = json["session"].as_str().unwrap();
        assert!(id.starts_with("session_"));

        let staged = PathBuf::from(json["staged"][0]["staged"].as_str().unwrap());
        assert!(staged.starts_with(sandbox.path("app").join(id).join("input_files")));
        assert_eq!(std::fs::read(&staged).unwrap(), vec![7u8; 500]);
    }

    #[test]
    fn stage_directory_into_persistent() {
        let sandbox = Sandbox::new();
        sandbox.source("a.json", b"{}");
        sandbox.source("nested/b.json", b"[]");

        sandbox
            .cmd()
            .arg("stage")
            .arg(sandbox.path("src"))
            .args(["--persistent", "--category", "collected", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("collected_jsons"));

        let output = sandbox
            .cmd()
            .args(["info", "--persistent", "--format", "json"])
            .output()
            .unwrap();
        let info = stdout_json(&output.stdout);
        assert_eq!(info["tracked_count"], 2);
        assert_eq!(info["mode"], "persistent");
    }

    #[test]
    fn stage_relative_path_records_absolute_source() {
        let sandbox = Sandbox::new();
        sandbox.source("rel.h", b"relative");

        let output = sandbox
            .cmd()
            .current_dir(sandbox.path("src"))
            .args(["stage", "rel.h", "--persistent", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json = stdout_json(&output.stdout);
        let source = PathBuf::from(json["staged"][0]["source"].as_str().unwrap());
        assert!(source.is_absolute());
        assert!(source.ends_with("src/rel.h"));
        let staged = PathBuf::from(json["staged"][0]["staged"].as_str().unwrap());
        assert!(staged
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("_SLASH_"));

        // Same file from another working directory is already tracked
        sandbox
            .cmd()
            .args(["changes", "--persistent", "--format", "plain"])
            .arg(std::fs::canonicalize(sandbox.path("src").join("rel.h")).unwrap())
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn stage_missing_source_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("stage")
            .arg(sandbox.path("does-not-exist.h"))
            .arg("--persistent")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Nothing staged"));
    }

    #[test]
    fn changes_lifecycle() {
        let sandbox = Sandbox::new();
        let edited = sandbox.source("edited.h", b"v1");
        let removed = sandbox.source("removed.h", b"gone soon");

        sandbox
            .cmd()
            .arg("stage")
            .arg(&edited)
            .arg(&removed)
            .arg("--persistent")
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["changes", "--persistent"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No changes"));

        std::fs::write(&edited, b"version two").unwrap();
        std::fs::remove_file(&removed).unwrap();

        sandbox
            .cmd()
            .args(["changes", "--persistent", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("M {}", edited.display())))
            .stdout(predicate::str::contains(format!("D {}", removed.display())));

        sandbox
            .cmd()
            .args(["changes", "--persistent", "--apply"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 re-staged, 1 untracked"));

        sandbox
            .cmd()
            .args(["changes", "--persistent", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn changes_reports_untracked_paths_as_added() {
        let sandbox = Sandbox::new();
        let fresh = sandbox.source("fresh.h", b"new");

        sandbox
            .cmd()
            .args(["changes", "--persistent", "--format", "plain"])
            .arg(&fresh)
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("A {}", fresh.display())));
    }

    #[test]
    fn changes_requires_session() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("changes")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No session selected"));
    }

    #[test]
    fn info_missing_session() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["info", "--session", "session_1700000000000_abc123"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Session not found"))
            .stderr(predicate::str::contains("stagecache list"));
    }

    #[test]
    fn artifact_save_and_list() {
        let sandbox = Sandbox::new();
        let report = sandbox.source("report.json", b"{\"ok\":true}");

        sandbox
            .cmd()
            .args(["artifact", "save", "--name", "report.json", "--persistent", "--from"])
            .arg(&report)
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["artifact", "list", "--persistent", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("report.json"));
    }

    #[test]
    fn export_without_results_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["export", "--persistent", "--dest"])
            .arg(sandbox.path("out"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("no result artifacts"));
    }

    #[test]
    fn export_copies_results() {
        let sandbox = Sandbox::new();
        let report = sandbox.source("summary.json", b"[1,2,3]");
        sandbox
            .cmd()
            .args(["artifact", "save", "--name", "summary.json", "--persistent", "--from"])
            .arg(&report)
            .assert()
            .success();

        let dest = sandbox.path("out");
        sandbox
            .cmd()
            .args(["export", "--persistent", "--dest"])
            .arg(&dest)
            .assert()
            .success();

        assert_eq!(std::fs::read(dest.join("summary.json")).unwrap(), b"[1,2,3]");
    }

    #[test]
    fn teardown_requires_explicit_target() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["teardown", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--session"));
    }

    #[test]
    fn teardown_without_yes_is_cancelled() {
        let sandbox = Sandbox::new();
        let source = sandbox.source("a.h", b"a");
        sandbox
            .cmd()
            .arg("stage")
            .arg(&source)
            .arg("--persistent")
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["teardown", "--persistent"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cancelled"));
        assert!(sandbox.path("app").join("persistent").exists());
    }

    #[test]
    fn teardown_archives_results() {
        let sandbox = Sandbox::new();
        let result = sandbox.source("result.json", b"{}");
        sandbox
            .cmd()
            .args(["artifact", "save", "--name", "result.json", "--persistent", "--from"])
            .arg(&result)
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["teardown", "--persistent", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Archived 1 result(s)"));

        assert!(!sandbox.path("app").join("persistent").exists());
        let archived: Vec<_> = std::fs::read_dir(sandbox.path("archive"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].join("result.json").exists());
    }

    #[test]
    fn corrupt_manifest_still_tears_down() {
        let sandbox = Sandbox::new();
        let source = sandbox.source("a.h", b"a");
        sandbox
            .cmd()
            .arg("stage")
            .arg(&source)
            .arg("--persistent")
            .assert()
            .success();

        let root = sandbox.path("app").join("persistent");
        std::fs::write(root.join(".stagecache-manifest.json"), "{trunc").unwrap();

        sandbox
            .cmd()
            .args(["info", "--persistent", "--format", "json"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["teardown", "--persistent", "--yes"])
            .assert()
            .success();
        assert!(!root.exists());
    }

    #[test]
    fn gc_dry_run_on_empty_root() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["gc", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No sessions older than 24h"));
    }

    #[test]
    fn gc_keeps_fresh_sessions() {
        let sandbox = Sandbox::new();
        let source = sandbox.source("a.h", b"a");
        sandbox.cmd().arg("stage").arg(&source).assert().success();

        sandbox
            .cmd()
            .args(["gc", "--hours", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("1 kept"));

        assert_session_count(&sandbox.path("app"), 1);
    }

    fn assert_session_count(app_root: &Path, expected: usize) {
        let count = std::fs::read_dir(app_root)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with("session_")
            })
            .count();
        assert_eq!(count, expected);
    }
}
