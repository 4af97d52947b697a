//! Glue between CLI flags and `boycivenga-config`.
//!
//! Loads the TOML config once and resolves profile, site, controller
//! settings and state path on top of the global flags.

use std::path::{Path, PathBuf};

use boycivenga_config::{
    self as config, Config, Overrides, Profile, enforce_ci_tls_policy, process_env,
};
use boycivenga_core::{ControllerConfig, StateStore};
use clap::ValueEnum;

use crate::cli::{ColorMode, GlobalOpts};
use crate::error::CliError;

/// Configuration resolved for one invocation.
pub struct Context<'a> {
    pub global: &'a GlobalOpts,
    config: Config,
}

impl<'a> Context<'a> {
    pub fn load(global: &'a GlobalOpts) -> Result<Self, CliError> {
        let config = config::load_config()?;
        Ok(Self { global, config })
    }

    fn profile(&self) -> Result<Option<(&str, &Profile)>, CliError> {
        Ok(self.config.select_profile(self.global.profile.as_deref())?)
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            controller: self.global.controller.clone(),
            site: self.global.site.clone(),
            username: self.global.username.clone(),
            insecure: self.global.insecure,
            timeout: self.global.timeout,
        }
    }

    /// The CI transport gate. Must run before any input is read.
    pub fn check_transport(&self) -> Result<(), CliError> {
        let profile = self.profile()?.map(|(_, p)| p);
        enforce_ci_tls_policy(&process_env, self.global.insecure, profile)?;
        Ok(())
    }

    pub fn site(&self) -> Result<String, CliError> {
        let profile = self.profile()?.map(|(_, p)| p);
        Ok(config::resolve_site(&self.overrides(), profile))
    }

    pub fn controller_config(&self) -> Result<ControllerConfig, CliError> {
        Ok(config::resolve_controller_config(
            &self.config,
            self.profile()?,
            &self.overrides(),
            &process_env,
        )?)
    }

    /// Recorded state for `site`: `--state-file`, else
    /// `<state-dir>/<site>-networks.json`.
    pub fn state_store(&self, site: &str, explicit: Option<&Path>) -> StateStore {
        let path = explicit.map_or_else(
            || StateStore::default_path(&self.state_dir(), site),
            Path::to_path_buf,
        );
        StateStore::new(path)
    }

    fn state_dir(&self) -> PathBuf {
        self.global
            .state_dir
            .clone()
            .unwrap_or_else(|| self.config.defaults.state_dir.clone())
    }

    /// Who is applying, for the recorded state.
    pub fn actor() -> String {
        config::resolve_actor(&process_env)
    }

    /// `--color`, else the configured default, else auto.
    pub fn color(&self) -> ColorMode {
        self.global.color.unwrap_or_else(|| {
            ColorMode::from_str(&self.config.defaults.color, true).unwrap_or_default()
        })
    }
}
