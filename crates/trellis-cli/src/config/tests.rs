use crate::cli::BuildArgs;
use crate::config::TrellisConfig;

#[test]
fn defaults_are_sensible() {
    let config = TrellisConfig::default();
    assert_eq!(config.entry_points, vec!["src/main.js"]);
    assert_eq!(config.out_dir, std::path::PathBuf::from("dist"));
    assert_eq!(config.dev.port, 4200);
    assert!(!config.optimize);
}

#[test]
fn cli_entries_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("trellis.config.json");
    std::fs::write(
        &config_path,
        r#"{"entryPoints":["src/app.ts"],"optimize":true}"#,
    )
    .unwrap();

    let args = BuildArgs {
        entry: vec!["src/other.ts".into()],
        config: Some(config_path),
        ..Default::default()
    };
    let config = TrellisConfig::load(&args).unwrap();
    assert_eq!(config.entry_points, vec!["src/other.ts"]);
    assert!(config.optimize);
}

#[test]
fn missing_explicit_config_file_is_reported() {
    let args = BuildArgs {
        config: Some("does-not-exist.json".into()),
        ..Default::default()
    };
    let err = TrellisConfig::load(&args).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn relative_base_href_is_rejected_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("trellis.config.json");
    std::fs::write(&config_path, r#"{"baseHref":"app/"}"#).unwrap();

    let args = BuildArgs {
        config: Some(config_path),
        ..Default::default()
    };
    let err = TrellisConfig::load(&args).unwrap_err();
    assert!(err.to_string().contains("baseHref"));
    assert!(err.to_string().contains("Hint:"));
}

#[test]
fn conversion_sorts_locales_deterministically() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("trellis.config.json");
    std::fs::write(
        &config_path,
        r#"{"i18n":{"sourceLocale":"en","locales":{"fr":null,"de":null,"en":null}}}"#,
    )
    .unwrap();

    let args = BuildArgs {
        config: Some(config_path),
        ..Default::default()
    };
    let config = TrellisConfig::load(&args).unwrap();
    let options = config.to_build_options(dir.path(), false);
    let ids: Vec<_> = options
        .i18n
        .unwrap()
        .locales
        .iter()
        .map(|l| l.id.clone())
        .collect();
    assert_eq!(ids, vec!["de", "en", "fr"]);
}
