//! Config subcommand handlers.

use std::fmt::Write;

use qbitly_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Format config for display, masking passwords.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "sync_interval_ms = {}", cfg.defaults.sync_interval_ms);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(interval) = p.sync_interval_ms {
            let _ = writeln!(out, "sync_interval_ms = {interval}");
        }
    }

    out
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword { new_password } => {
            let cfg = config::load_config_or_default();
            let profile = config::active_profile_name(global, &cfg);
            qbitly_config::store_password(&profile, &new_password)?;
            output::print_status(
                &format!("Password stored in keyring for profile '{profile}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use qbitly_config::Profile;

    use super::*;

    #[test]
    fn redacts_plaintext_passwords() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "seedbox".into(),
            Profile {
                url: "https://seedbox.example.com".into(),
                username: Some("alice".into()),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );

        let shown = format_config_redacted(&cfg);
        assert!(shown.contains("[profiles.seedbox]"));
        assert!(shown.contains("username = \"alice\""));
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
    }
}
