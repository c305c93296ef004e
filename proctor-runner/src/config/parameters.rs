// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::ConfigParseError;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::{collections::BTreeMap, fmt};

/// A source of string-valued configuration parameters.
pub trait ConfigurationParameters: fmt::Debug + Send + Sync {
    /// Returns the value of the parameter `key`, if it is set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Configuration parameters held in memory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapConfigurationParameters {
    values: BTreeMap<String, String>,
}

impl MapConfigurationParameters {
    /// Creates an empty set of parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfigurationParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ConfigurationParameters for MapConfigurationParameters {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Configuration parameters layered from a TOML file, the environment and explicit overrides.
///
/// Later layers take priority: explicit overrides beat environment variables, which beat the file.
/// Property names are dotted paths, so `proctor.execution.timeout.default` can be set with:
///
/// ```toml
/// [proctor.execution.timeout]
/// default = "5s"
/// ```
///
/// or with the environment variable `PROCTOR_EXECUTION_TIMEOUT_DEFAULT=5s`.
#[derive(Clone, Debug)]
pub struct LayeredConfigurationParameters {
    config: Config,
}

impl LayeredConfigurationParameters {
    /// The default location of the config file within a workspace.
    pub const CONFIG_PATH: &'static str = ".config/proctor.toml";

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "PROCTOR";

    /// Returns a builder for a new set of layered parameters.
    pub fn builder() -> LayeredConfigurationBuilder {
        LayeredConfigurationBuilder::default()
    }
}

impl ConfigurationParameters for LayeredConfigurationParameters {
    fn get(&self, key: &str) -> Option<String> {
        self.config.get_string(key).ok()
    }
}

#[derive(Clone, Debug)]
enum EnvironmentSource {
    Process,
    Map(BTreeMap<String, String>),
}

/// Builder for [`LayeredConfigurationParameters`].
#[derive(Clone, Debug, Default)]
pub struct LayeredConfigurationBuilder {
    config_file: Option<(Utf8PathBuf, bool)>,
    environment: Option<EnvironmentSource>,
    overrides: Vec<(String, String)>,
}

impl LayeredConfigurationBuilder {
    /// Reads the given TOML file, which must exist.
    pub fn set_config_file(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.config_file = Some((path.into(), true));
        self
    }

    /// Reads [`CONFIG_PATH`](LayeredConfigurationParameters::CONFIG_PATH) under
    /// `workspace_root` if it exists.
    pub fn set_workspace_root(&mut self, workspace_root: &Utf8Path) -> &mut Self {
        self.config_file = Some((
            workspace_root.join(LayeredConfigurationParameters::CONFIG_PATH),
            false,
        ));
        self
    }

    /// Reads `PROCTOR_*` variables from the process environment.
    pub fn set_process_environment(&mut self) -> &mut Self {
        self.environment = Some(EnvironmentSource::Process);
        self
    }

    /// Reads `PROCTOR_*` variables from the given map instead of the process environment.
    pub fn set_environment_map<I, K, V>(&mut self, vars: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(EnvironmentSource::Map(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    /// Sets `key` to `value`, overriding every other layer.
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// Reads every configured layer.
    pub fn build(&self) -> Result<LayeredConfigurationParameters, ConfigParseError> {
        let mut builder = Config::builder();

        let config_file = self.config_file.as_ref().map(|(path, _)| path.clone());
        if let Some((path, required)) = &self.config_file {
            builder =
                builder.add_source(File::new(path.as_str(), FileFormat::Toml).required(*required));
        }

        if let Some(environment) = &self.environment {
            let source =
                Environment::with_prefix(LayeredConfigurationParameters::ENVIRONMENT_PREFIX)
                    .keep_prefix(true)
                    .separator("_");
            let source = match environment {
                EnvironmentSource::Process => source,
                EnvironmentSource::Map(vars) => source.source(Some(
                    vars.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )),
            };
            builder = builder.add_source(source);
        }

        for (key, value) in &self.overrides {
            builder = builder
                .set_override(key.as_str(), value.as_str())
                .map_err(|err| ConfigParseError::new(None, err))?;
        }

        let config = builder
            .build()
            .map_err(|err| ConfigParseError::new(config_file, err))?;
        Ok(LayeredConfigurationParameters { config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::properties;
    use camino_tempfile::tempdir;
    use indoc::indoc;
    use maplit::btreemap;

    #[test]
    fn map_parameters() {
        let parameters: MapConfigurationParameters =
            [(properties::DEFAULT_TIMEOUT, "5s")].into_iter().collect();
        assert_eq!(
            parameters.get(properties::DEFAULT_TIMEOUT).as_deref(),
            Some("5s")
        );
        assert_eq!(parameters.get(properties::TIMEOUT_MODE), None);
    }

    #[test]
    fn layers_apply_in_priority_order() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("proctor.toml");
        std::fs::write(
            &config_path,
            indoc! {r#"
                [proctor.execution.timeout]
                default = "30s"
                mode = "enabled"

                [proctor.execution.timeout.test.method]
                default = "10s"

                [proctor.execution.timeout.thread.mode]
                default = "separate_thread"
            "#},
        )
        .unwrap();

        let parameters = LayeredConfigurationParameters::builder()
            .set_config_file(&config_path)
            .set_environment_map(btreemap! {
                "PROCTOR_EXECUTION_TIMEOUT_DEFAULT" => "20s",
                "UNRELATED_VARIABLE" => "ignored",
            })
            .set_override(properties::TIMEOUT_MODE, "disabled")
            .build()
            .expect("config is valid");

        assert_eq!(
            parameters.get(properties::DEFAULT_TIMEOUT).as_deref(),
            Some("20s"),
            "environment beats the file"
        );
        assert_eq!(
            parameters.get(properties::TIMEOUT_MODE).as_deref(),
            Some("disabled"),
            "overrides beat the file"
        );
        assert_eq!(
            parameters
                .get(properties::DEFAULT_TEST_METHOD_TIMEOUT)
                .as_deref(),
            Some("10s")
        );
        assert_eq!(
            parameters
                .get(properties::DEFAULT_TIMEOUT_THREAD_MODE)
                .as_deref(),
            Some("separate_thread")
        );
        assert_eq!(parameters.get(properties::DEFAULT_AFTER_ALL_METHOD_TIMEOUT), None);
    }

    #[test]
    fn missing_workspace_config_is_fine() {
        let dir = tempdir().unwrap();
        let parameters = LayeredConfigurationParameters::builder()
            .set_workspace_root(dir.path())
            .build()
            .expect("an absent workspace config is not an error");
        assert_eq!(parameters.get(properties::DEFAULT_TIMEOUT), None);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("does-not-exist.toml");
        let error = LayeredConfigurationParameters::builder()
            .set_config_file(&config_path)
            .build()
            .expect_err("an explicit config file must exist");
        assert_eq!(error.config_file(), Some(&config_path));
        assert!(
            error.to_string().contains("failed to parse proctor config"),
            "unexpected error: {error}"
        );
    }
}
