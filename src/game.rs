use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    LogLevel,
    database::Database,
    error::{DatabaseLockPoisonError, GameHandleCreationError, LoadPluginsError, SortPluginsError},
    escape_ascii,
    logging::{self, format_details, is_log_enabled},
    metadata::{Filename, plugin_metadata::GHOST_FILE_EXTENSION},
    plugin::{
        LoadScope, Plugin,
        error::{InvalidFilenameReason, PluginValidationError},
        plugins_metadata, validate_plugin_path_and_header,
    },
    sorting::{
        groups::build_groups_graph,
        plugins::{PluginSortingData, sort_plugins},
    },
};

/// Codes used to create database handles for specific games.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[non_exhaustive]
pub enum GameType {
    /// The Elder Scrolls IV: Oblivion
    Oblivion,
    /// The Elder Scrolls V: Skyrim
    Skyrim,
    /// Fallout 3
    Fallout3,
    /// Fallout: New Vegas
    FalloutNV,
    /// Fallout 4
    Fallout4,
    /// The Elder Scrolls V: Skyrim Special Edition
    SkyrimSE,
    /// Fallout 4 VR
    Fallout4VR,
    /// Skyrim VR
    SkyrimVR,
    /// The Elder Scrolls III: Morrowind
    Morrowind,
    /// Starfield
    Starfield,
    /// OpenMW
    OpenMW,
    /// The Elder Scrolls IV: Oblivion Remastered
    OblivionRemastered,
}

impl Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::Oblivion => write!(f, "The Elder Scrolls IV: Oblivion"),
            GameType::Skyrim => write!(f, "The Elder Scrolls V: Skyrim"),
            GameType::Fallout3 => write!(f, "Fallout 3"),
            GameType::FalloutNV => write!(f, "Fallout: New Vegas"),
            GameType::Fallout4 => write!(f, "Fallout 4"),
            GameType::SkyrimSE => write!(f, "The Elder Scrolls V: Skyrim Special Edition"),
            GameType::Fallout4VR => write!(f, "Fallout 4 VR"),
            GameType::SkyrimVR => write!(f, "The Elder Scrolls V: Skyrim VR"),
            GameType::Morrowind => write!(f, "The Elder Scrolls III: Morrowind"),
            GameType::Starfield => write!(f, "Starfield"),
            GameType::OpenMW => write!(f, "OpenMW"),
            GameType::OblivionRemastered => write!(f, "The Elder Scrolls IV: Oblivion Remastered"),
        }
    }
}

impl From<GameType> for esplugin::GameId {
    fn from(value: GameType) -> Self {
        match value {
            GameType::Oblivion | GameType::OblivionRemastered => esplugin::GameId::Oblivion,
            GameType::Skyrim => esplugin::GameId::Skyrim,
            GameType::Fallout3 => esplugin::GameId::Fallout3,
            GameType::FalloutNV => esplugin::GameId::FalloutNV,
            GameType::Fallout4 | GameType::Fallout4VR => esplugin::GameId::Fallout4,
            GameType::SkyrimSE | GameType::SkyrimVR => esplugin::GameId::SkyrimSE,
            GameType::Morrowind | GameType::OpenMW => esplugin::GameId::Morrowind,
            GameType::Starfield => esplugin::GameId::Starfield,
        }
    }
}

/// The interface through which game-specific functionality is provided.
#[derive(Debug)]
pub struct Game {
    game_type: GameType,
    game_path: PathBuf,
    additional_data_paths: Vec<PathBuf>,
    // Stored in an Arc<RwLock<_>> to support loading metadata in parallel with
    // loading plugins.
    database: Arc<RwLock<Database>>,
    cache: GameCache,
}

impl Game {
    /// Initialise a new game handle, which is then used by all game-specific
    /// functions.
    ///
    /// - `game_type` is a value representing which game to create the handle
    ///   for,
    /// - `game_path` is the relative or absolute path to the directory
    ///   containing the game's executable.
    pub fn new(game_type: GameType, game_path: &Path) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\"",
            game_type,
            escape_ascii(game_path)
        );

        let resolved_game_path = resolve_path(game_path);
        if !resolved_game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        Ok(Game {
            game_type,
            game_path: resolved_game_path,
            additional_data_paths: Vec::new(),
            database: Arc::new(RwLock::new(Database::default())),
            cache: GameCache::default(),
        })
    }

    /// Initialise a new game handle, which is then used by all game-specific
    /// functions.
    ///
    /// - `game_type` is a value representing which game to create the handle
    ///   for,
    /// - `game_path` is the relative or absolute path to the directory
    ///   containing the game's executable,
    /// - `game_local_path` is the relative or absolute path to the game's
    ///   local application data folder. It is validated but otherwise unused,
    ///   since this library does not read or write on-disk load order state.
    pub fn with_local_path(
        game_type: GameType,
        game_path: &Path,
        game_local_path: &Path,
    ) -> Result<Self, GameHandleCreationError> {
        logging::info!(
            "Attempting to create a game handle for game type \"{}\" with game path \"{}\" and game local path \"{}\"",
            game_type,
            escape_ascii(game_path),
            escape_ascii(game_local_path)
        );

        let resolved_game_path = resolve_path(game_path);
        if !resolved_game_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(game_path.into()));
        }

        let resolved_game_local_path = resolve_path(game_local_path);
        if resolved_game_local_path.exists() && !resolved_game_local_path.is_dir() {
            return Err(GameHandleCreationError::NotADirectory(
                game_local_path.into(),
            ));
        }

        Ok(Game {
            game_type,
            game_path: resolved_game_path,
            additional_data_paths: Vec::new(),
            database: Arc::new(RwLock::new(Database::default())),
            cache: GameCache::default(),
        })
    }

    /// Get the game's type.
    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    /// Gets the currently-set additional data paths.
    pub fn additional_data_paths(&self) -> &[PathBuf] {
        &self.additional_data_paths
    }

    /// Set additional data paths.
    ///
    /// Additional data paths take precedence over the game's main data path
    /// when resolving plugin paths, and are checked in the order they are
    /// given.
    pub fn set_additional_data_paths(
        &mut self,
        additional_data_paths: &[&Path],
    ) -> Result<(), DatabaseLockPoisonError> {
        self.additional_data_paths = additional_data_paths
            .iter()
            .map(|p| p.to_path_buf())
            .collect();

        Ok(())
    }

    /// Get the object used for accessing metadata-related functionality.
    pub fn database(&self) -> Arc<RwLock<Database>> {
        Arc::clone(&self.database)
    }

    /// Check if a file is a valid plugin.
    ///
    /// The validity check is not exhaustive: it generally checks that the
    /// file is a valid plugin file extension for the game and that its header
    /// (if applicable) can be parsed.
    ///
    /// `plugin_path` can be absolute or relative: relative paths are resolved
    /// relative to the game's plugins directory, while absolute paths are used
    /// as given.
    pub fn is_valid_plugin(&self, plugin_path: &Path) -> bool {
        let resolved_path = resolve_plugin_path(self.game_type, &self.data_path(), plugin_path);
        validate_plugin_path_and_header(self.game_type, &resolved_path).is_ok()
    }

    /// Fully parses plugins and loads their data.
    ///
    /// If a given plugin filename (or one that is case-insensitively equal) has
    /// already been loaded, its previously-loaded data is discarded.
    ///
    /// If the game is Morrowind, OpenMW or Starfield, it's only valid to fully
    /// load a plugin if its masters are already loaded or included in the same
    /// input slice.
    ///
    /// Relative paths in `plugin_paths` are resolved relative to the game's
    /// plugins directory, while absolute paths are used as given. Each plugin
    /// filename must be unique within the given slice.
    pub fn load_plugins(&mut self, plugin_paths: &[&Path]) -> Result<(), LoadPluginsError> {
        let mut plugins = self.load_plugins_common(plugin_paths, LoadScope::WholePlugin)?;

        if matches!(
            self.game_type,
            GameType::Morrowind | GameType::OpenMW | GameType::Starfield
        ) {
            let mut loaded_plugins: HashMap<Filename, &Plugin> = self
                .cache
                .plugins()
                .iter()
                .map(|(k, v)| (k.clone(), v.as_ref()))
                .collect();

            for plugin in &plugins {
                loaded_plugins.insert(Filename::new(plugin.name().to_owned()), plugin);
            }

            let loaded_plugins: Vec<_> = loaded_plugins.into_values().collect();

            let plugins_metadata = plugins_metadata(&loaded_plugins)?;

            for plugin in &mut plugins {
                plugin.resolve_record_ids(&plugins_metadata)?;
            }
        }

        self.store_plugins(plugins);

        Ok(())
    }

    /// Parses plugin headers and loads their data.
    ///
    /// If a given plugin filename (or one that is case-insensitively equal) has
    /// already been loaded, its previously-loaded data is discarded.
    ///
    /// Relative paths in `plugin_paths` are resolved relative to the game's
    /// plugins directory, while absolute paths are used as given. Each plugin
    /// filename must be unique within the given slice.
    pub fn load_plugin_headers(&mut self, plugin_paths: &[&Path]) -> Result<(), LoadPluginsError> {
        let plugins = self.load_plugins_common(plugin_paths, LoadScope::HeaderOnly)?;

        self.store_plugins(plugins);

        Ok(())
    }

    fn load_plugins_common(
        &mut self,
        plugin_paths: &[&Path],
        load_scope: LoadScope,
    ) -> Result<Vec<Plugin>, LoadPluginsError> {
        let data_path = self.data_path();

        validate_plugin_paths(self.game_type, &data_path, plugin_paths)?;

        logging::trace!("Starting loading {load_scope}s.");

        Ok(load_plugins_in_parallel(
            &data_path,
            plugin_paths,
            self.game_type,
            load_scope,
        ))
    }

    fn store_plugins(&mut self, plugins: Vec<Plugin>) {
        self.cache.insert_plugins(plugins);
    }

    /// Clears the plugins loaded by previous calls to [Game::load_plugins] or
    /// [Game::load_plugin_headers].
    pub fn clear_loaded_plugins(&mut self) {
        self.cache.clear_plugins();
    }

    /// Get data for a loaded plugin.
    pub fn plugin(&self, plugin_name: &str) -> Option<Arc<Plugin>> {
        self.cache.plugin(plugin_name).cloned()
    }

    /// Get data for all loaded plugins.
    pub fn loaded_plugins(&self) -> Vec<Arc<Plugin>> {
        self.cache.plugins_iter().cloned().collect()
    }

    /// Calculates a new load order for the given already-loaded plugins and
    /// returns it.
    ///
    /// This pulls metadata from the masterlist and userlist if they are
    /// loaded, combined with the loaded data of each plugin. This library does
    /// not read, write or otherwise interact with on-disk load order state: it
    /// only computes an order that satisfies the known constraints and returns
    /// it for the caller to apply however is appropriate.
    ///
    /// All given plugins must have already been loaded using
    /// [Game::load_plugins] or [Game::load_plugin_headers].
    ///
    /// Diagnostic messages generated while sorting are appended to the
    /// database's sort message log, which is cleared at the start of the call
    /// and restored to its previous state if sorting fails.
    pub fn sort_plugins(&self, plugin_names: &[&str]) -> Result<Vec<String>, SortPluginsError> {
        let plugins = plugin_names
            .iter()
            .map(|n| {
                self.cache
                    .plugin(n)
                    .cloned()
                    .ok_or_else(|| SortPluginsError::PluginNotLoaded((*n).to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if is_log_enabled(LogLevel::Debug) {
            logging::debug!("Current load order:");
            for plugin_name in plugin_names {
                logging::debug!("\t{plugin_name}");
            }
        }

        let mut database = self.database.write()?;
        let previous_sort_messages = database.clear_sort_messages();

        let result = sort_plugins_using(&database, &plugins);

        let new_load_order = match result {
            Ok(order) => order,
            Err(e) => {
                database.restore_sort_messages(previous_sort_messages);
                return Err(e);
            }
        };

        if is_log_enabled(LogLevel::Debug) {
            logging::debug!("Sorted load order:");
            for plugin_name in &new_load_order {
                logging::debug!("\t{plugin_name}");
            }
        }

        Ok(new_load_order)
    }

    fn data_path(&self) -> PathBuf {
        data_path(self.game_type, &self.game_path)
    }
}

fn sort_plugins_using(
    database: &Database,
    plugins: &[Arc<Plugin>],
) -> Result<Vec<String>, SortPluginsError> {
    let plugins_sorting_data = plugins
        .iter()
        .map(|p| to_plugin_sorting_data(database, p))
        .collect::<Result<Vec<_>, _>>()?;

    let groups_graph = build_groups_graph(&database.groups(false), database.user_groups())?;

    sort_plugins(plugins_sorting_data, &groups_graph).map_err(Into::into)
}

fn resolve_path(path: &Path) -> PathBuf {
    if path.is_symlink() {
        path.read_link().unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn data_path(game_type: GameType, game_path: &Path) -> PathBuf {
    match game_type {
        GameType::Morrowind => game_path.join("Data Files"),
        GameType::OpenMW => game_path.join("resources/vfs"),
        GameType::OblivionRemastered => {
            game_path.join("OblivionRemastered/Content/Dev/ObvData/Data")
        }
        _ => game_path.join("Data"),
    }
}

fn validate_plugin_paths(
    game_type: GameType,
    data_path: &Path,
    plugin_paths: &[&Path],
) -> Result<(), PluginValidationError> {
    let mut seen = HashSet::new();
    for path in plugin_paths {
        let Some(filename) = path.file_name() else {
            return Err(PluginValidationError::invalid(
                (*path).into(),
                InvalidFilenameReason::Empty,
            ));
        };

        if !seen.insert(Filename::new(filename.to_string_lossy().into_owned())) {
            return Err(PluginValidationError::invalid(
                (*path).into(),
                InvalidFilenameReason::NonUnique,
            ));
        }
    }

    plugin_paths
        .par_iter()
        .map(|path| {
            let resolved_path = resolve_plugin_path(game_type, data_path, path);
            validate_plugin_path_and_header(game_type, &resolved_path)
        })
        .collect()
}

/// Loads the given plugins in parallel across a fixed worker pool. Paths are
/// sorted by descending file size before being handed to rayon, so that the
/// largest (and usually slowest to parse) plugins are started first rather
/// than left to chance by the default work-stealing split.
fn load_plugins_in_parallel(
    data_path: &Path,
    plugin_paths: &[&Path],
    game_type: GameType,
    load_scope: LoadScope,
) -> Vec<Plugin> {
    let mut paths_by_size: Vec<(u64, &Path)> = plugin_paths
        .iter()
        .map(|path| {
            let resolved_path = resolve_plugin_path(game_type, data_path, path);
            let size = std::fs::metadata(&resolved_path)
                .map(|m| m.len())
                .unwrap_or(0);
            (size, *path)
        })
        .collect();

    paths_by_size.sort_by_key(|(size, _)| std::cmp::Reverse(*size));

    let plugins = Mutex::new(Vec::with_capacity(plugin_paths.len()));

    paths_by_size.par_iter().for_each(|(_, path)| {
        if let Some(plugin) = try_load_plugin(data_path, path, game_type, load_scope)
            && let Ok(mut plugins) = plugins.lock()
        {
            plugins.push(plugin);
        }
    });

    plugins.into_inner().unwrap_or_else(|e| e.into_inner())
}

fn try_load_plugin(
    data_path: &Path,
    plugin_path: &Path,
    game_type: GameType,
    load_scope: LoadScope,
) -> Option<Plugin> {
    let resolved_path = resolve_plugin_path(game_type, data_path, plugin_path);

    match Plugin::new(game_type, &resolved_path, load_scope) {
        Ok(plugin) => Some(plugin),
        Err(e) => {
            logging::error!(
                "Caught error while trying to load \"{}\": {}",
                escape_ascii(plugin_path),
                format_details(&e)
            );
            None
        }
    }
}

fn resolve_plugin_path(game_type: GameType, data_path: &Path, plugin_path: &Path) -> PathBuf {
    let plugin_path = data_path.join(plugin_path);

    if game_type == GameType::OpenMW || plugin_path.exists() {
        return plugin_path;
    }

    let Some(filename) = plugin_path.file_name() else {
        return plugin_path;
    };

    logging::debug!(
        "Could not find plugin at \"{}\", adding {} file extension",
        escape_ascii(&plugin_path),
        GHOST_FILE_EXTENSION
    );

    let mut ghosted_filename = filename.to_os_string();
    ghosted_filename.push(GHOST_FILE_EXTENSION);
    plugin_path.with_file_name(ghosted_filename)
}

fn to_plugin_sorting_data<'a>(
    database: &Database,
    plugin: &'a Plugin,
) -> Result<PluginSortingData<'a, Plugin>, SortPluginsError> {
    let masterlist_metadata = database.plugin_metadata(plugin.name(), false)?;
    let user_metadata = database.plugin_user_metadata(plugin.name())?;

    PluginSortingData::new(plugin, masterlist_metadata.as_ref(), user_metadata.as_ref())
        .map_err(Into::into)
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct GameCache {
    plugins: HashMap<Filename, Arc<Plugin>>,
}

impl GameCache {
    fn insert_plugins(&mut self, plugins: Vec<Plugin>) {
        for plugin in plugins {
            self.plugins
                .insert(Filename::new(plugin.name().to_owned()), Arc::new(plugin));
        }
    }

    fn clear_plugins(&mut self) {
        self.plugins.clear();
    }

    fn plugins(&self) -> &HashMap<Filename, Arc<Plugin>> {
        &self.plugins
    }

    fn plugins_iter(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins.values()
    }

    fn plugin(&self, plugin_name: &str) -> Option<&Arc<Plugin>> {
        self.plugins.get(&Filename::new(plugin_name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use array_parameterized_test::parameterized_test;

    use crate::tests::{
        ALL_GAME_TYPES, BLANK_DIFFERENT_ESM, BLANK_DIFFERENT_ESP, BLANK_ESM, BLANK_ESP,
        BLANK_FULL_ESM, BLANK_MASTER_DEPENDENT_ESM, Fixture, NON_PLUGIN_FILE,
    };

    fn game(game_type: GameType) -> (Fixture, Game) {
        let fixture = Fixture::new(game_type);
        let game =
            Game::with_local_path(fixture.game_type, &fixture.game_path, &fixture.local_path)
                .unwrap();
        (fixture, game)
    }

    mod new {
        use super::*;

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_succeed_if_given_valid_game_path(game_type: GameType) {
            let fixture = Fixture::new(game_type);

            assert!(Game::new(fixture.game_type, &fixture.game_path).is_ok());
        }

        #[test]
        fn should_error_if_given_a_game_path_that_does_not_exist() {
            let game_path = Path::new("missing");
            match Game::new(GameType::Morrowind, game_path) {
                Err(GameHandleCreationError::NotADirectory(p)) => assert_eq!(game_path, p),
                _ => panic!("Expected a not-a-directory error"),
            }
        }
    }

    mod with_local_path {
        use super::*;

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_succeed_if_given_valid_paths(game_type: GameType) {
            let (_fixture, _game) = game(game_type);
        }

        #[test]
        fn should_error_if_given_a_game_path_that_does_not_exist() {
            let fixture = Fixture::new(GameType::Oblivion);

            let game_path = Path::new("missing");
            let result = Game::with_local_path(fixture.game_type, game_path, &fixture.local_path);

            match result {
                Err(GameHandleCreationError::NotADirectory(p)) => assert_eq!(game_path, p),
                _ => panic!("Expected a not-a-directory error"),
            }
        }

        #[test]
        fn should_succeed_if_given_a_local_path_that_does_not_exist() {
            let fixture = Fixture::new(GameType::Oblivion);

            let local_path = Path::new("missing");
            let result =
                Game::with_local_path(fixture.game_type, &fixture.game_path, local_path);

            assert!(result.is_ok());
        }
    }

    mod is_valid_plugin {
        use super::*;

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_return_false_for_a_non_plugin_file(game_type: GameType) {
            let (_fixture, game) = game(game_type);

            assert!(!game.is_valid_plugin(Path::new(NON_PLUGIN_FILE)));
        }

        #[test]
        fn should_resolve_relative_paths_relative_to_the_data_path() {
            let (fixture, game) = game(GameType::Oblivion);

            let path = Path::new("..")
                .join(fixture.data_path().file_name().unwrap())
                .join(BLANK_ESM);

            assert!(game.is_valid_plugin(&path));
        }

        #[test]
        fn should_use_absolute_paths_as_given() {
            let (fixture, game) = game(GameType::Oblivion);

            let path = fixture.data_path().join(BLANK_ESM);

            assert!(game.is_valid_plugin(&path));
        }
    }

    mod load_plugin_headers {
        use super::*;

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_load_the_headers_of_the_given_plugins(game_type: GameType) {
            let (_fixture, mut game) = game(game_type);

            assert!(game.plugin(BLANK_ESM).is_none());
            assert!(game.plugin(BLANK_ESP).is_none());

            game.load_plugin_headers(&[Path::new(BLANK_ESM), Path::new(BLANK_ESP)])
                .unwrap();

            assert!(game.plugin(BLANK_ESM).is_some());
            assert!(game.plugin(BLANK_ESP).is_some());
        }

        #[test]
        fn should_replace_an_existing_cache_entry_for_the_same_plugin() {
            let (_fixture, mut game) = game(GameType::Morrowind);

            game.load_plugin_headers(&[Path::new(BLANK_ESM)]).unwrap();
            assert!(game.plugin(BLANK_ESM).is_some());

            game.load_plugin_headers(&[Path::new(BLANK_ESM)]).unwrap();
            assert!(game.plugin(BLANK_ESM).is_some());
        }
    }

    mod load_plugins {
        use std::error::Error;

        use super::*;

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_fully_load_the_given_plugins(game_type: GameType) {
            let (_fixture, mut game) = game(game_type);

            assert!(game.plugin(BLANK_ESM).is_none());

            game.load_plugins(&[Path::new(BLANK_ESM), Path::new(BLANK_ESP)])
                .unwrap();

            assert!(game.plugin(BLANK_ESM).is_some());
            assert!(game.plugin(BLANK_ESP).is_some());
        }

        #[parameterized_test(ALL_GAME_TYPES)]
        fn should_error_if_a_master_is_not_loaded_and_game_requires_all_masters_present(
            game_type: GameType,
        ) {
            let (_fixture, mut game) = game(game_type);

            let paths = &[Path::new(BLANK_MASTER_DEPENDENT_ESM)];

            if matches!(
                game_type,
                GameType::Morrowind | GameType::OpenMW | GameType::Starfield
            ) {
                match game.load_plugins(paths) {
                    Err(LoadPluginsError::PluginDataError(e)) => {
                        let source = e.source().expect("expected a source error");
                        let esplugin_error = source
                            .downcast_ref::<esplugin::Error>()
                            .expect("expected an esplugin error");
                        match esplugin_error {
                            esplugin::Error::PluginMetadataNotFound(name) => {
                                let expected = if game_type == GameType::Starfield {
                                    BLANK_FULL_ESM
                                } else {
                                    BLANK_ESM
                                };
                                assert_eq!(expected, name);
                            }
                            other => panic!("Unexpected esplugin error: {other}"),
                        }
                    }
                    other => panic!("Expected a plugin data error, got {other:?}"),
                }
            } else {
                game.load_plugins(paths).unwrap();

                assert!(game.plugin(BLANK_MASTER_DEPENDENT_ESM).is_some());
            }
        }
    }

    mod clear_loaded_plugins {
        use super::*;

        #[test]
        fn should_remove_all_cached_plugins() {
            let (_fixture, mut game) = game(GameType::Oblivion);

            game.load_plugin_headers(&[Path::new(BLANK_ESM)]).unwrap();
            assert!(game.plugin(BLANK_ESM).is_some());

            game.clear_loaded_plugins();

            assert!(game.plugin(BLANK_ESM).is_none());
            assert!(game.loaded_plugins().is_empty());
        }
    }

    mod sort_plugins {
        use super::*;

        #[test]
        fn should_return_an_empty_vec_if_given_no_plugins() {
            let (_fixture, game) = game(GameType::Oblivion);

            assert!(game.sort_plugins(&[]).unwrap().is_empty());
        }

        #[test]
        fn should_error_if_a_plugin_has_not_been_loaded() {
            let (_fixture, game) = game(GameType::Oblivion);

            match game.sort_plugins(&[BLANK_ESM]) {
                Err(SortPluginsError::PluginNotLoaded(n)) => assert_eq!(BLANK_ESM, n),
                other => panic!("Expected a plugin not loaded error, got {other:?}"),
            }
        }

        #[test]
        fn should_sort_loaded_plugins_by_master_flag() {
            let (_fixture, mut game) = game(GameType::Oblivion);

            game.load_plugin_headers(&[Path::new(BLANK_DIFFERENT_ESP), Path::new(BLANK_ESM)])
                .unwrap();

            let sorted = game
                .sort_plugins(&[BLANK_DIFFERENT_ESP, BLANK_ESM])
                .unwrap();

            assert_eq!(
                vec![BLANK_ESM.to_owned(), BLANK_DIFFERENT_ESP.to_owned()],
                sorted
            );
        }
    }
}
