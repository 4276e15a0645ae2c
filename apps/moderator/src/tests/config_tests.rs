use super::*;

use std::{
    collections::HashMap,
    env, fs,
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

static TEMP_DIRS: AtomicUsize = AtomicUsize::new(0);

/// Writes `contents` to a fresh temp dir, loads it, and removes the dir again.
fn load_from_temp_config(
    contents: &str,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ModeratorSettings> {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!(
        "moderator_config_test_{suffix}_{}",
        TEMP_DIRS.fetch_add(1, Ordering::SeqCst)
    ));
    fs::create_dir_all(&temp_root).expect("temp dir");
    let path = temp_root.join("moderator.toml");
    fs::write(&path, contents).expect("write config");

    let loaded = load_settings_from(&path, env_lookup);

    fs::remove_dir_all(&temp_root).expect("cleanup");
    assert!(!temp_root.exists());
    loaded
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn missing_file_yields_defaults() {
    let path = env::temp_dir().join("moderator_config_test_absent/moderator.toml");
    let settings = load_settings_from(&path, no_env).expect("defaults");
    assert_eq!(settings, ModeratorSettings::default());
}

#[test]
fn file_values_override_defaults() {
    let settings = load_from_temp_config(
        r#"
server_url = "https://studyhub.example/api/"
role = "admin"
page_limit = 25
count_strategy = "probe"
"#,
        no_env,
    )
    .expect("settings");

    assert_eq!(settings.server_url, "https://studyhub.example/api");
    assert_eq!(settings.role, Role::Admin);
    assert_eq!(settings.page_limit, 25);
    assert_eq!(
        settings.count_strategy_for(ContentKind::StudyMaterial),
        CountStrategy::ListProbe
    );
}

#[test]
fn environment_overrides_file() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("APP__SERVER_URL", "http://env.example"),
        ("MODERATOR_TOKEN", "from-env"),
        ("MODERATOR_ROLE", "reviewer"),
    ]);

    let settings = load_from_temp_config(
        "server_url = \"http://file.example\"\ntoken = \"from-file\"\n",
        |key| vars.get(key).map(|v| v.to_string()),
    )
    .expect("settings");

    assert_eq!(settings.server_url, "http://env.example");
    assert_eq!(settings.token.as_deref(), Some("from-env"));
    assert_eq!(settings.role, Role::Moderator);
}

#[test]
fn rejects_zero_page_limit_and_unknown_strategy() {
    assert!(load_from_temp_config("page_limit = 0\n", no_env).is_err());

    assert!(parse_count_strategy("guess").is_err());
}

#[test]
fn count_strategy_defaults_per_kind() {
    let settings = ModeratorSettings::default();
    assert_eq!(
        settings.count_strategy_for(ContentKind::Course),
        CountStrategy::Dedicated
    );
    assert_eq!(
        settings.count_strategy_for(ContentKind::BlogPost),
        CountStrategy::ListProbe
    );
}
