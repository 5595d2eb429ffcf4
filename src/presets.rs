/*!
Preset defaults: override declared defaults from a JSON or YAML file.

The file carries token lists, not values — each `opts` entry is a
trigger plus its value tokens, each `args` entry the tokens of one named
positional argument. Application is a **trial bind**: the tokens are
bound against a deep copy of the real group, and every leaf the trial
managed to set transfers its value onto the real group as that leaf's
new default. The real binding state is never disturbed, so command-line
input still wins over anything the file says.

`cmds` sections descend the subcommand hierarchy together with the
command chain.
*/

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::command::CliCallback;
use crate::convert::Arity;
use crate::errors::{Error, PresetError};
use crate::group::ParamGroup;
use crate::parameter::Param;

/// The shape of a preset file (or of one named section of it).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresetConfig {
    /// Option token lists: trigger first, value tokens after.
    pub opts: Vec<Vec<String>>,
    /// Positional tokens, keyed by (dotted) argument name.
    pub args: BTreeMap<String, Vec<String>>,
    /// Sections for subcommands, keyed by subcommand name.
    pub cmds: BTreeMap<String, PresetConfig>,
}

impl PresetConfig {
    /// Option entries must be a trigger followed by plain value tokens.
    pub fn check(&self) -> Result<(), PresetError> {
        for entry in &self.opts {
            let trigger_led = entry
                .first()
                .is_some_and(|first| first.starts_with('-'));
            let plain_tail = entry.iter().skip(1).all(|token| !token.starts_with('-'));

            if !trigger_led || !plain_tail {
                return Err(PresetError::NotATrigger(entry.clone()));
            }
        }

        for section in self.cmds.values() {
            section.check()?;
        }

        Ok(())
    }
}

fn read_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PresetError> {
    let text = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("json") => serde_json::from_str(&text).map_err(|error| PresetError::Parse {
            path: path.to_path_buf(),
            message: error.to_string(),
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&text).map_err(|error| PresetError::Parse {
                path: path.to_path_buf(),
                message: error.to_string(),
            })
        }
        _ => Err(PresetError::UnknownExtension(path.to_path_buf())),
    }
}

/// Read a preset file holding a single configuration.
pub fn read_preset_file(path: &Path) -> Result<PresetConfig, PresetError> {
    read_file(path)
}

/**
Read a preset reference of the form `file` or `file#section`.

With a section name the file must hold a map of named configurations;
without one it must hold a single configuration.
*/
pub fn read_preset_ref(spec: &str) -> Result<PresetConfig, PresetError> {
    match spec.split_once('#') {
        None => read_preset_file(Path::new(spec)),
        Some((path, section)) => {
            let path = Path::new(path);
            let mut sections: BTreeMap<String, PresetConfig> = read_file(path)?;

            sections
                .remove(section)
                .ok_or_else(|| PresetError::UnknownSection {
                    path: path.to_path_buf(),
                    section: section.to_string(),
                })
        }
    }
}

fn transfer(trial: &ParamGroup, real: &mut ParamGroup) -> Result<(), Error> {
    for (bound, target) in trial.params().iter().zip(real.params_mut()) {
        match (bound, target) {
            (Param::Group(bound_group), Param::Group(target_group)) => {
                transfer(bound_group, target_group)?;
            }
            (bound, target) => {
                if !bound.unset() {
                    let value = bound.value()?;
                    target.set_default(value);
                }
            }
        }
    }

    Ok(())
}

/**
Apply a preset configuration to a group.

The configured tokens are bound against a deep copy; every leaf the
trial bind set becomes a new default on the real group. Tokens that a
trial bind cannot fully consume, or that bind with an error, reject the
whole preset.
*/
pub fn apply(group: &mut ParamGroup, config: &PresetConfig) -> Result<(), Error> {
    config.check()?;

    let mut trial = group.clone();

    for entry in &config.opts {
        let leftover = trial.process(entry)?;
        if !leftover.is_empty() {
            return Err(PresetError::Leftover {
                tokens: entry.clone(),
                leftover,
            }
            .into());
        }
    }

    for (name, tokens) in &config.args {
        let arg = trial
            .lookup_mut(name)
            .and_then(Param::as_arg_mut)
            .ok_or_else(|| PresetError::NotAnArgument(name.clone()))?;

        let leftover = arg.process(tokens);
        if !leftover.is_empty() {
            return Err(PresetError::Leftover {
                tokens: tokens.clone(),
                leftover,
            }
            .into());
        }
    }

    transfer(&trial, group)
}

/// The `--defaults-file <file[#section]>` eager callback: loads a preset
/// reference and applies it to the current command, keeping the
/// subcommand sections for later descent.
#[must_use]
pub fn defaults_callback() -> CliCallback {
    CliCallback::new(
        ["--defaults-file"],
        "Read defaults from file",
        Arity::fixed(1),
        |cmd, args| {
            let config = read_preset_ref(&args[0])?;
            apply(&mut cmd.group, &config)?;
            cmd.presets = Some(config);
            Ok(())
        },
    )
}
