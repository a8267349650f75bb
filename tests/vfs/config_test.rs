/*!
 * Environment Configuration Tests
 */

use pretty_assertions::assert_eq;
use sandbox_fs::{ConfigError, SandboxConfig, SandboxFs};
use serial_test::serial;

const VARS: [&str; 3] = [
    "SANDBOX_ROOT",
    "SANDBOX_STRICT_RESOLUTION",
    "SANDBOX_MAX_SYMLINKS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_requires_root() {
    clear_env();
    assert_eq!(
        SandboxConfig::from_env(),
        Err(ConfigError::Missing("SANDBOX_ROOT".into()))
    );

    std::env::set_var("SANDBOX_ROOT", "");
    assert!(matches!(
        SandboxConfig::from_env(),
        Err(ConfigError::Missing(_))
    ));
    clear_env();
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    std::env::set_var("SANDBOX_ROOT", "/srv/tenants/a1b2");

    let config = SandboxConfig::from_env().unwrap();
    assert_eq!(config, SandboxConfig::new("/srv/tenants/a1b2"));
    assert!(config.strict_resolution);
    assert_eq!(config.max_symlink_expansions, 40);
    clear_env();
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("SANDBOX_ROOT", "/srv/tenants/a1b2");
    std::env::set_var("SANDBOX_STRICT_RESOLUTION", "false");
    std::env::set_var("SANDBOX_MAX_SYMLINKS", "8");

    let config = SandboxConfig::from_env().unwrap();
    assert!(!config.strict_resolution);
    assert_eq!(config.max_symlink_expansions, 8);
    clear_env();
}

#[test]
#[serial]
fn test_from_env_invalid_values() {
    clear_env();
    std::env::set_var("SANDBOX_ROOT", "/srv/tenants/a1b2");

    std::env::set_var("SANDBOX_STRICT_RESOLUTION", "sometimes");
    assert_eq!(
        SandboxConfig::from_env(),
        Err(ConfigError::InvalidValue {
            key: "SANDBOX_STRICT_RESOLUTION".into(),
            value: "sometimes".into(),
        })
    );
    std::env::remove_var("SANDBOX_STRICT_RESOLUTION");

    std::env::set_var("SANDBOX_MAX_SYMLINKS", "lots");
    assert!(matches!(
        SandboxConfig::from_env(),
        Err(ConfigError::InvalidValue { .. })
    ));

    std::env::set_var("SANDBOX_MAX_SYMLINKS", "0");
    assert_eq!(SandboxConfig::from_env(), Err(ConfigError::SymlinkLimit(0)));
    clear_env();
}

#[test]
fn test_engine_from_config() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut config = SandboxConfig::new(temp.path());
    config.max_symlink_expansions = 4;

    let fs = SandboxFs::with_config(&config).unwrap();
    assert_eq!(fs.root(), temp.path().canonicalize().unwrap());

    config.strict_resolution = false;
    let fs = SandboxFs::with_config(&config).unwrap();
    assert_eq!(fs.mode(), sandbox_fs::ResolutionMode::Fallback);
}

#[test]
fn test_engine_rejects_bad_root() {
    let temp = tempfile::TempDir::new().unwrap();
    std::fs::write(temp.path().join("file"), b"x").unwrap();

    assert!(SandboxFs::new(temp.path().join("missing"), true)
        .unwrap_err()
        .is_not_exist());
    assert!(SandboxFs::new(temp.path().join("file"), true).is_err());

    let mut config = SandboxConfig::new(temp.path());
    config.max_symlink_expansions = 0;
    assert!(SandboxFs::with_config(&config).is_err());
}
