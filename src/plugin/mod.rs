pub mod error;

use std::path::Path;

use esplugin::ParseOptions;

use crate::{GameType, logging, metadata::plugin_metadata::trim_dot_ghost};
use error::{
    InvalidFilenameReason, LoadPluginError, PluginDataError, PluginValidationError,
    PluginValidationErrorReason,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) enum LoadScope {
    HeaderOnly,
    WholePlugin,
}

impl std::fmt::Display for LoadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadScope::HeaderOnly => write!(f, "plugin header"),
            LoadScope::WholePlugin => write!(f, "whole plugin"),
        }
    }
}

/// Represents a plugin file that has been loaded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Plugin {
    name: String,
    plugin: Option<esplugin::Plugin>,
    game_type: GameType,
}

impl Plugin {
    pub(crate) fn new(
        game_type: GameType,
        plugin_path: &Path,
        load_scope: LoadScope,
    ) -> Result<Self, LoadPluginError> {
        let name = name_string(game_type, plugin_path)?;

        let parse_options = if load_scope == LoadScope::HeaderOnly {
            ParseOptions::header_only()
        } else {
            ParseOptions::whole_plugin()
        };

        let plugin =
            if game_type != GameType::OpenMW || !has_ascii_extension(plugin_path, "omwscripts") {
                let mut plugin = esplugin::Plugin::new(game_type.into(), plugin_path);
                plugin.parse_file(parse_options)?;

                Some(plugin)
            } else {
                None
            };

        Ok(Self {
            name,
            plugin,
            game_type,
        })
    }

    /// Get the plugin's filename.
    ///
    /// If the plugin was ghosted when it was loaded, this filename will be
    /// without the .ghost suffix, unless the game is OpenMW, in which case
    /// ghosted plugins are not supported.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the value of the version field in the `HEDR` subrecord of the
    /// plugin's `TES4` record.
    ///
    /// Returns `None` if the `TES4` record does not exist (e.g. for Morrowind
    /// and OpenMW) or if the `HEDR` subrecord could not be found, or if the
    /// version field's value was `NaN`.
    pub fn header_version(&self) -> Option<f32> {
        self.plugin.as_ref().and_then(|p| p.header_version())
    }

    /// Get the plugin's masters, i.e. the plugins this plugin's file header
    /// declares as prerequisites.
    pub fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        self.plugin
            .as_ref()
            .map(|p| p.masters().map_err(Into::into))
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Check if the plugin is a master plugin.
    ///
    /// What causes a plugin to be a master plugin varies by game, but is
    /// usually indicated by the plugin having its master flag set and/or by its
    /// file extension. However, OpenMW uses neither for determining plugins'
    /// load order so all OpenMW plugins are treated as non-masters.
    ///
    /// The term "master" is potentially confusing: a plugin A may not be a
    /// *master plugin*, but may still be a *master of* another plugin by being
    /// listed as such in that plugin's header record. Master plugins are
    /// sometimes referred to as *master files* or simply *masters*, while the
    /// other meaning is always referenced in relation to another plugin.
    pub fn is_master(&self) -> bool {
        if self.game_type == GameType::OpenMW {
            false
        } else {
            self.plugin
                .as_ref()
                .map(|p| p.is_master_file())
                .unwrap_or(false)
        }
    }

    /// Check if the plugin is a light plugin.
    pub fn is_light_plugin(&self) -> bool {
        self.plugin
            .as_ref()
            .map(|p| p.is_light_plugin())
            .unwrap_or(false)
    }

    /// Check if the plugin is a medium plugin.
    pub fn is_medium_plugin(&self) -> bool {
        self.plugin
            .as_ref()
            .map(|p| p.is_medium_plugin())
            .unwrap_or(false)
    }

    /// Check if the plugin is an update plugin.
    pub fn is_update_plugin(&self) -> bool {
        self.plugin
            .as_ref()
            .map(|p| p.is_update_plugin())
            .unwrap_or(false)
    }

    /// Check if the plugin is a blueprint plugin.
    pub fn is_blueprint_plugin(&self) -> bool {
        self.plugin
            .as_ref()
            .map(|p| p.is_blueprint_plugin())
            .unwrap_or(false)
    }

    /// Check if the plugin contains any records other than its `TES3`/`TES4`
    /// header.
    pub fn is_empty(&self) -> bool {
        self.plugin
            .as_ref()
            .and_then(|p| p.record_and_group_count())
            .unwrap_or(0)
            == 0
    }

    /// Check if two plugins contain a record with the same FormID.
    ///
    /// FormIDs are compared for all games apart from Morrowind, which doesn't
    /// have FormIDs and so has other identifying data compared.
    pub fn do_records_overlap(&self, plugin: &Plugin) -> Result<bool, PluginDataError> {
        if let (Some(plugin), Some(other_plugin)) = (&self.plugin, &plugin.plugin) {
            plugin.overlaps_with(other_plugin).map_err(Into::into)
        } else {
            Ok(false)
        }
    }

    /// Get the number of records this plugin defines or overrides.
    pub(crate) fn override_record_count(&self) -> Result<usize, PluginDataError> {
        self.plugin
            .as_ref()
            .map(|p| p.count_override_records().map_err(Into::into))
            .unwrap_or(Ok(0))
    }

    pub(crate) fn resolve_record_ids(
        &mut self,
        plugins_metadata: &[esplugin::PluginMetadata],
    ) -> Result<(), PluginDataError> {
        if let Some(plugin) = &mut self.plugin {
            plugin.resolve_record_ids(plugins_metadata)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_plugin_path_and_header(
    game_type: GameType,
    plugin_path: &Path,
) -> Result<(), PluginValidationError> {
    if game_type == GameType::OpenMW && has_ascii_extension(plugin_path, "omwscripts") {
        Ok(())
    } else if !has_plugin_file_extension(game_type, plugin_path) {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::invalid(
            plugin_path.into(),
            InvalidFilenameReason::UnsupportedFileExtension,
        ))
    } else if esplugin::Plugin::is_valid(game_type.into(), plugin_path, ParseOptions::header_only())
    {
        Ok(())
    } else {
        logging::debug!(
            "The file \"{}\" is not a valid plugin",
            plugin_path.display()
        );
        Err(PluginValidationError::new(
            plugin_path.into(),
            PluginValidationErrorReason::InvalidPluginHeader,
        ))
    }
}

fn has_plugin_file_extension(game_type: GameType, plugin_path: &Path) -> bool {
    let extension = if game_type != GameType::OpenMW && has_ascii_extension(plugin_path, "ghost") {
        plugin_path
            .file_stem()
            .and_then(|s| Path::new(s).extension())
    } else {
        plugin_path.extension()
    };

    if let Some(extension) = extension {
        if extension.eq_ignore_ascii_case("esp")
            || extension.eq_ignore_ascii_case("esm")
            || (game_type == GameType::OpenMW
                && (extension.eq_ignore_ascii_case("omwaddon")
                    || extension.eq_ignore_ascii_case("omwgame")
                    || extension.eq_ignore_ascii_case("omwscripts")))
        {
            true
        } else {
            matches!(
                game_type,
                GameType::Fallout4
                    | GameType::Fallout4VR
                    | GameType::SkyrimSE
                    | GameType::SkyrimVR
                    | GameType::Starfield
            ) && extension.eq_ignore_ascii_case("esl")
        }
    } else {
        false
    }
}

pub(crate) fn has_ascii_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

pub(crate) fn plugins_metadata(
    plugins: &[&Plugin],
) -> Result<Vec<esplugin::PluginMetadata>, PluginDataError> {
    let esplugins: Vec<_> = plugins.iter().filter_map(|p| p.plugin.as_ref()).collect();
    Ok(esplugin::plugins_metadata(&esplugins)?)
}

fn name_string(game_type: GameType, path: &Path) -> Result<String, LoadPluginError> {
    match path.file_name() {
        Some(f) => match f.to_str() {
            Some(f) if game_type == GameType::OpenMW => Ok(f.to_string()),
            Some(f) => Ok(trim_dot_ghost(f).to_string()),
            None => Err(LoadPluginError::InvalidFilename(
                InvalidFilenameReason::NonUnicode,
            )),
        },
        None => Err(LoadPluginError::InvalidFilename(
            InvalidFilenameReason::Empty,
        )),
    }
}
