//! CLI configuration: thin wrapper around `qbitly_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --username, --password, ...) on top of the profile in the config file.

use std::time::Duration;

use secrecy::SecretString;

use qbitly_config::{Config, Profile};
use qbitly_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use qbitly_config::{config_path, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI
/// overrides.
///
/// Without a matching profile, `--url` alone is enough; the username
/// falls back to `admin` and the password to empty.
pub fn build_controller_config(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let Some(profile) = cfg.profiles.get(&profile_name) else {
        // An explicitly named profile must exist.
        if global.profile.is_some() {
            cfg.profile(Some(&profile_name))?;
        }
        let url = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        let profile = Profile {
            url: url.to_owned(),
            password: Some(global.password.clone().unwrap_or_default()),
            ..Profile::default()
        };
        return resolve_profile(&profile, &profile_name, global, cfg);
    };

    resolve_profile(profile, &profile_name, global, cfg)
}

/// Translate a `Profile` + global flags into a `ControllerConfig`.
///
/// CLI flag overrides take priority over profile values, profile values
/// over `[defaults]`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ControllerConfig, CliError> {
    let url = qbitly_config::parse_url(global.url.as_deref().unwrap_or(&profile.url))?;

    let username = global
        .username
        .clone()
        .unwrap_or_else(|| qbitly_config::resolve_username(profile));

    let password = match global.password {
        Some(ref pw) => SecretString::from(pw.clone()),
        None => qbitly_config::resolve_password(profile, profile_name)?,
    };

    let insecure = global.insecure || profile.insecure.unwrap_or(cfg.defaults.insecure);
    let tls = if insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    let sync_interval = qbitly_config::sync_interval(
        profile
            .sync_interval_ms
            .unwrap_or(cfg.defaults.sync_interval_ms),
    )?;

    Ok(ControllerConfig {
        url,
        username,
        password,
        login: None,
        tls,
        timeout: Duration::from_secs(timeout),
        sync_interval,
    })
}
