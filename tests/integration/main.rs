//! Integration tests for opcat

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn opcat() -> Command {
        let mut cmd = cargo_bin_cmd!("opcat");
        cmd.env_remove("OPCAT_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    /// opcat with a config file inside `dir`
    fn opcat_in(dir: &Path) -> Command {
        let mut cmd = opcat();
        cmd.arg("--config").arg(dir.join("config.toml"));
        cmd
    }

    fn seed_index(cache: &Path) {
        fs::create_dir_all(cache.join("operatorhubio/foo/olm.package")).unwrap();
        fs::write(
            cache.join("operatorhubio/foo/olm.package/foo.json"),
            r#"{"schema":"olm.package","name":"foo"}"#,
        )
        .unwrap();
        fs::write(
            cache.join("index.json"),
            r#"{"operatorhubio":{"resolvedRef":"quay.io/operatorhubio/catalog@sha256:abc","cachedAt":"2026-01-02T03:04:05Z"}}"#,
        )
        .unwrap();
    }

    #[test]
    fn help_displays() {
        opcat()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("browse operator catalogs"));
    }

    #[test]
    fn version_displays() {
        opcat()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("opcat"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        opcat_in(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        opcat_in(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[catalogd]"))
            .stdout(predicate::str::contains("olmv1-system"));
    }

    #[test]
    fn config_init_then_refuse_overwrite() {
        let temp = TempDir::new().unwrap();
        opcat_in(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(temp.path().join("config.toml").is_file());

        opcat_in(temp.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("config.toml"), "[catalogd\nnamespace = ").unwrap();
        opcat_in(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_path_honours_flag() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        opcat_in(temp.path())
            .args(["cache", "path", "--cache-dir"])
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains(cache.display().to_string()));
    }

    #[test]
    fn cache_path_from_config() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("configured-cache");
        fs::write(
            temp.path().join("config.toml"),
            format!("[cache]\ndir = {:?}\n", cache.display().to_string()),
        )
        .unwrap();

        opcat_in(temp.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("configured-cache"));
    }

    #[test]
    fn cache_status_empty() {
        let temp = TempDir::new().unwrap();
        opcat_in(temp.path())
            .args(["cache", "status", "--cache-dir"])
            .arg(temp.path().join("cache"))
            .assert()
            .success()
            .stdout(predicate::str::contains("No catalogs cached"));
    }

    #[test]
    fn cache_status_json() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        seed_index(&cache);

        opcat_in(temp.path())
            .args(["cache", "status", "--format", "json", "--cache-dir"])
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"catalog\": \"operatorhubio\""))
            .stdout(predicate::str::contains("sha256:abc"))
            .stdout(predicate::str::contains("\"present\": true"));
    }

    #[test]
    fn cache_clear_removes_index() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("cache");
        seed_index(&cache);

        opcat_in(temp.path())
            .args(["cache", "clear", "--cache-dir"])
            .arg(&cache)
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed 1 cached catalog(s)"));

        assert!(!cache.join("index.json").exists());
        assert!(!cache.join("operatorhubio").exists());
    }

    #[test]
    fn packages_without_kubectl_fails_with_hint() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("config.toml"),
            "[kubectl]\nbinary = \"/nonexistent/kubectl-for-opcat-tests\"\n",
        )
        .unwrap();

        opcat_in(temp.path())
            .args(["packages", "--cache-dir"])
            .arg(temp.path().join("cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stderr(predicate::str::contains("kubectl"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn bundles_help() {
        opcat()
            .args(["bundles", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--package"))
            .stdout(predicate::str::contains("--format"));
    }
}
