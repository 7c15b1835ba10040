use shoebox::config::Config;

#[test]
fn example_config_parses_and_matches_defaults() {
    let cfg: Config = toml::from_str(include_str!("../shoebox.example.toml")).unwrap();
    let defaults = Config::default();

    assert_eq!(cfg.global.client_name, defaults.global.client_name);
    assert_eq!(cfg.global.delete_source, defaults.global.delete_source);
    assert_eq!(cfg.paths.source_dir, defaults.paths.source_dir);
    assert_eq!(cfg.paths.processed_dir, defaults.paths.processed_dir);
    assert_eq!(cfg.batch.size, defaults.batch.size);
    assert_eq!(cfg.batch.checkpoint_every, defaults.batch.checkpoint_every);
    assert_eq!(cfg.retry.max_attempts, defaults.retry.max_attempts);
    assert_eq!(cfg.retry.copy_max_attempts, defaults.retry.copy_max_attempts);
    assert_eq!(cfg.naming.max_base_len, defaults.naming.max_base_len);
    assert_eq!(cfg.api.model, defaults.api.model);
    assert_eq!(cfg.api.api_key_env, defaults.api.api_key_env);
    assert_eq!(cfg.rendering.pdftoppm_path, "auto");
    assert_eq!(cfg.logging.level, "info");
}

#[test]
fn empty_document_yields_defaults() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.batch.size, 10);
    assert_eq!(cfg.naming.fallback_year, "2024");
    assert!(cfg.global.delete_source);
}

#[test]
fn partial_sections_fill_in_defaults() {
    let cfg: Config = toml::from_str(
        r#"
        [global]
        client_name = "Acme LLC"

        [batch]
        size = 3
        "#,
    )
    .unwrap();
    assert_eq!(cfg.global.client_name, "Acme LLC");
    assert!(cfg.global.delete_source);
    assert_eq!(cfg.batch.size, 3);
    assert_eq!(cfg.batch.checkpoint_every, 5);
}

#[test]
fn malformed_toml_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("bad.toml");
    std::fs::write(&path, "[global\nclient_name = ").unwrap();
    assert!(Config::load(&path).is_err());
}
