use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use saphyr::{LoadableYamlNode, MarkedYaml};

use crate::{escape_ascii, logging};

use super::{
    error::{
        ExpectedType, LoadMetadataError, MetadataDocumentParsingError, ParseMetadataError,
        RegexError, WriteMetadataError, WriteMetadataErrorReason,
    },
    file::Filename,
    group::Group,
    message::Message,
    plugin_metadata::PluginMetadata,
    yaml::{YamlObjectType, get_as_hash, get_as_slice},
    yaml_emit::{EmitYaml, YamlEmitter},
    yaml_merge::process_merge_keys,
};

/// Holds the plugin and group metadata loaded from a single YAML document,
/// i.e. either the masterlist or the userlist.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct MetadataDocument {
    bash_tags: Vec<String>,
    groups: Vec<Group>,
    messages: Vec<Message>,
    plugins: HashMap<Arc<Filename>, PluginMetadata>,
    regex_plugins: Vec<PluginMetadata>,
    ordered_plugin_names: Vec<Arc<Filename>>,
}

impl MetadataDocument {
    pub(crate) fn load(&mut self, file_path: &Path) -> Result<(), LoadMetadataError> {
        if !file_path.exists() {
            return Err(LoadMetadataError::new(
                file_path.into(),
                MetadataDocumentParsingError::PathNotFound,
            ));
        }

        logging::trace!("Loading file at \"{}\"", escape_ascii(file_path));

        let content = std::fs::read_to_string(file_path)
            .map_err(|e| LoadMetadataError::from_io_error(file_path.into(), e))?;

        self.load_from_str(&content)
            .map_err(|e| LoadMetadataError::new(file_path.into(), e))?;

        logging::trace!(
            "Successfully loaded metadata from file at \"{}\".",
            escape_ascii(file_path)
        );

        Ok(())
    }

    fn load_from_str(&mut self, string: &str) -> Result<(), MetadataDocumentParsingError> {
        let mut docs = MarkedYaml::load_from_str(string)?;

        let doc = docs.pop().ok_or(MetadataDocumentParsingError::NoDocuments)?;

        if !docs.is_empty() {
            return Err(MetadataDocumentParsingError::MoreThanOneDocument(
                docs.len() + 1,
            ));
        }

        let doc = process_merge_keys(doc)?;

        let hash = get_as_hash(&doc, YamlObjectType::MetadataDocument)?;

        let mut plugins = HashMap::new();
        let mut regex_plugins = Vec::new();
        let mut ordered_plugin_names = Vec::new();
        for plugin_yaml in get_as_slice(hash, "plugins", YamlObjectType::MetadataDocument)? {
            let plugin = PluginMetadata::try_from(plugin_yaml)?;
            let filename = Arc::new(Filename::new(plugin.name().to_owned()));

            if plugin.is_regex_plugin() {
                regex_plugins.push(plugin);
            } else if let Some(old) = plugins.insert(Arc::clone(&filename), plugin) {
                return Err(ParseMetadataError::duplicate_entry(
                    plugin_yaml.span.start,
                    old.name().to_owned(),
                    YamlObjectType::PluginMetadata,
                )
                .into());
            }

            ordered_plugin_names.push(filename);
        }

        let messages = get_as_slice(hash, "globals", YamlObjectType::MetadataDocument)?
            .iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut bash_tags = Vec::new();
        for bash_tag_yaml in get_as_slice(hash, "bash_tags", YamlObjectType::MetadataDocument)? {
            let bash_tag = match bash_tag_yaml.data.as_str() {
                Some(b) => b,
                None => {
                    return Err(ParseMetadataError::unexpected_type(
                        bash_tag_yaml.span.start,
                        YamlObjectType::MetadataDocument,
                        ExpectedType::String,
                    )
                    .into());
                }
            };

            bash_tags.push(bash_tag.to_owned());
        }

        let mut group_names = HashSet::new();
        let mut groups = Vec::new();
        for group_yaml in get_as_slice(hash, "groups", YamlObjectType::MetadataDocument)? {
            let group = Group::try_from(group_yaml)?;

            let name = group.name().to_owned();
            if group_names.contains(&name) {
                return Err(ParseMetadataError::duplicate_entry(
                    group_yaml.span.start,
                    group.name().to_owned(),
                    YamlObjectType::Group,
                )
                .into());
            }

            groups.push(group);
            group_names.insert(name);
        }

        if !group_names.contains(Group::DEFAULT_NAME) {
            groups.insert(0, Group::default());
        }

        self.plugins = plugins;
        self.regex_plugins = regex_plugins;
        self.ordered_plugin_names = ordered_plugin_names;
        self.messages = messages;
        self.bash_tags = bash_tags;
        self.groups = groups;

        Ok(())
    }

    pub(crate) fn save(&self, file_path: &Path) -> Result<(), WriteMetadataError> {
        if file_path.exists() {
            return Err(WriteMetadataError::new(
                file_path.into(),
                WriteMetadataErrorReason::PathAlreadyExists,
            ));
        }

        logging::trace!("Saving metadata list to: \"{}\"", escape_ascii(file_path));

        let plugins: Vec<_> = self
            .ordered_plugins_iter()
            .filter(|p| !p.has_name_only())
            .collect();

        let mut emitter = YamlEmitter::new();

        emitter.begin_map();

        if !self.bash_tags.is_empty() {
            emitter.map_key("bash_tags");
            emitter.begin_array();
            for bash_tag in &self.bash_tags {
                emitter.single_quoted_str(bash_tag);
            }
            emitter.end_array();
        }

        if self.groups.len() > 1 {
            emitter.map_key("groups");
            self.groups.emit_yaml(&mut emitter);
        }

        if !self.messages.is_empty() {
            emitter.map_key("globals");
            self.messages.emit_yaml(&mut emitter);
        }

        if !plugins.is_empty() {
            emitter.map_key("plugins");
            emitter.begin_array();
            for plugin in &plugins {
                plugin.emit_yaml(&mut emitter);
            }
            emitter.end_array();
        }

        emitter.end_map();

        let mut contents = emitter.into_string();
        if contents.is_empty() {
            contents = "{}".into();
        }

        std::fs::write(file_path, contents)
            .map_err(|e| WriteMetadataError::new(file_path.into(), e.into()))?;

        Ok(())
    }

    pub(crate) fn bash_tags(&self) -> &[String] {
        &self.bash_tags
    }

    pub(crate) fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn ordered_plugins_iter(&self) -> impl Iterator<Item = &PluginMetadata> {
        self.ordered_plugin_names.iter().filter_map(|f| {
            self.plugins.get(f).or_else(|| {
                self.regex_plugins
                    .iter()
                    .find(|r| r.name() == f.as_ref().as_str())
            })
        })
    }

    pub(crate) fn find_plugin(
        &self,
        plugin_name: &str,
    ) -> Result<Option<PluginMetadata>, RegexError> {
        let mut metadata = match self.plugins.get(&Filename::new(plugin_name.to_owned())) {
            Some(m) => m.clone(),
            None => PluginMetadata::new(plugin_name)?,
        };

        // Now we want to also match possibly multiple regex entries.
        for regex_plugin in &self.regex_plugins {
            if regex_plugin.name_matches(plugin_name) {
                metadata.merge_metadata(regex_plugin);
            }
        }

        if metadata.has_name_only() {
            Ok(None)
        } else {
            Ok(Some(metadata))
        }
    }

    pub(crate) fn set_bash_tags(&mut self, bash_tags: Vec<String>) {
        self.bash_tags = bash_tags;
    }

    pub(crate) fn set_groups(&mut self, groups: Vec<Group>) {
        // Ensure that the default group is present.
        let default_group_exists = groups.iter().any(|g| g.name() == Group::DEFAULT_NAME);

        if default_group_exists {
            self.groups = groups;
        } else {
            self.groups.clear();
            self.groups.push(Group::default());
            self.groups.extend(groups);
        }
    }

    pub(crate) fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub(crate) fn set_plugin_metadata(&mut self, plugin_metadata: PluginMetadata) {
        let filename = Arc::new(Filename::new(plugin_metadata.name().to_owned()));

        if plugin_metadata.is_regex_plugin() {
            self.regex_plugins.push(plugin_metadata);
            self.ordered_plugin_names.push(filename);
        } else {
            let old_value = self.plugins.insert(Arc::clone(&filename), plugin_metadata);
            if old_value.is_none() {
                self.ordered_plugin_names.push(filename);
            }
        }
    }

    pub(crate) fn remove_plugin_metadata(&mut self, plugin_name: &str) {
        let filename = Filename::new(plugin_name.to_owned());
        let mut was_removed = self.plugins.remove(&filename).is_some();

        // Only remove regex plugins if no specific plugin was removed, because
        // they're mutually exclusive.
        if !was_removed {
            self.regex_plugins.retain(|p| {
                let equal = unicase::eq(p.name(), plugin_name);
                if equal {
                    was_removed = true;
                }
                !equal
            });
        }

        if was_removed {
            self.ordered_plugin_names
                .retain(|f| f.as_ref() != &filename);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.bash_tags.clear();
        self.groups.clear();
        self.messages.clear();
        self.plugins.clear();
        self.regex_plugins.clear();
        self.ordered_plugin_names.clear();
    }
}

impl std::default::Default for MetadataDocument {
    fn default() -> Self {
        Self {
            bash_tags: Vec::default(),
            groups: vec![Group::default()],
            messages: Vec::default(),
            plugins: HashMap::default(),
            regex_plugins: Vec::default(),
            ordered_plugin_names: Vec::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::metadata::{PluginCleaningData, Tag, TagSuggestion};

    use super::*;

    const METADATA_LIST_YAML: &str = r#"bash_tags:
  - 'C.Climate'
  - 'Relev'

groups:
  - name: group1
    after:
      - group2
  - name: group2
    after:
      - default

globals:
  - type: say
    content: 'A global message.'

plugins:
  - name: 'Blank.esm'
    priority: -100
    msg:
      - type: warn
        content: 'This is a warning.'
      - type: say
        content: 'This message should be removed when evaluating conditions.'
        condition: 'active("Blank - Different.esm")'

  - name: 'Blank.+\.esp'
    after:
      - 'Blank.esm'

  - name: 'Blank.+(Different)?.*\.esp'
    inc:
      - 'Blank.esp'

  - name: 'Blank.esp'
    group: group2
    dirty:
      - crc: 0xDEADBEEF
        util: utility
    "#;

    mod load_from_str {
        use super::*;

        #[test]
        fn should_resolve_merge_keys() {
            let yaml = r#"
globals:
  - &anchor
    type: say
    content: test message
  - <<: *anchor
    condition: file("test.esp")
"#;

            let mut metadata_list = MetadataDocument::default();
            metadata_list.load_from_str(yaml).unwrap();

            assert_eq!(2, metadata_list.messages().len());
        }

        #[test]
        fn should_error_if_a_plugin_has_two_exact_entries() {
            let yaml = "
plugins:
  - name: 'Blank.esm'
    msg:
      - type: warn
        content: 'This is a warning.'

  - name: 'Blank.esm'
    msg:
      - type: error
        content: 'This plugin entry will cause a failure, as it is not the first exact entry.'
        ";

            let mut metadata_list = MetadataDocument::default();
            assert!(metadata_list.load_from_str(yaml).is_err());
        }

        #[test]
        fn should_skip_missing_sections() {
            let mut metadata_list = MetadataDocument::default();

            metadata_list.load_from_str("{}").unwrap();

            assert!(metadata_list.bash_tags().is_empty());
            assert!(metadata_list.messages().is_empty());
            assert_eq!(1, metadata_list.groups().len());
        }

        #[test]
        fn should_read_priority_from_plugin_entries() {
            let mut metadata_list = MetadataDocument::default();
            metadata_list.load_from_str(METADATA_LIST_YAML).unwrap();

            let plugin = metadata_list.find_plugin("Blank.esm").unwrap().unwrap();

            assert_eq!(-100, plugin.priority());
        }
    }

    mod load {
        use super::*;

        #[test]
        fn should_deserialise_masterlist() {
            let tmp_dir = tempdir().unwrap();

            let path = tmp_dir.path().join("masterlist.yaml");
            std::fs::write(&path, METADATA_LIST_YAML).unwrap();

            let mut metadata_list = MetadataDocument::default();
            metadata_list.load(&path).unwrap();

            let mut plugin_names_iter = metadata_list
                .ordered_plugins_iter()
                .map(PluginMetadata::name);
            assert_eq!("Blank.esm", plugin_names_iter.next().unwrap());
            assert_eq!("Blank.+\\.esp", plugin_names_iter.next().unwrap());
            assert_eq!(
                "Blank.+(Different)?.*\\.esp",
                plugin_names_iter.next().unwrap()
            );
            assert_eq!("Blank.esp", plugin_names_iter.next().unwrap());
            assert_eq!(None, plugin_names_iter.next());

            assert_eq!(
                vec!["C.Climate", "Relev"],
                metadata_list
                    .bash_tags()
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
            );

            let groups = metadata_list.groups();
            assert_eq!(3, groups.len());

            assert_eq!("default", groups[0].name());
            assert!(groups[0].after_groups().is_empty());

            assert_eq!("group1", groups[1].name());
            assert_eq!(vec!["group2".to_string()], groups[1].after_groups());

            assert_eq!("group2", groups[2].name());
            assert_eq!(vec!["default".to_string()], groups[2].after_groups());
        }

        #[test]
        fn should_error_if_the_path_does_not_exist() {
            let tmp_dir = tempdir().unwrap();
            let path = tmp_dir.path().join("does-not-exist.yaml");

            let mut metadata_list = MetadataDocument::default();
            assert!(metadata_list.load(&path).is_err());
        }

        #[test]
        fn should_error_if_an_invalid_metadata_file_is_given() {
            let tmp_dir = tempdir().unwrap();
            let path = tmp_dir.path().join("masterlist.yaml");
            let yaml = r"
  - 'C.Climate'
  - 'Relev'
";
            std::fs::write(&path, yaml).unwrap();

            let mut metadata_list = MetadataDocument::default();
            assert!(metadata_list.load(&path).is_err());
        }
    }

    mod save {
        use super::*;

        #[test]
        fn should_error_if_the_path_already_exists() {
            let tmp_dir = tempdir().unwrap();
            let path = tmp_dir.path().join("masterlist.yaml");
            std::fs::write(&path, "{}").unwrap();

            let metadata_list = MetadataDocument::default();
            assert!(metadata_list.save(&path).is_err());
        }

        #[test]
        fn should_write_an_empty_map_if_there_is_no_metadata() {
            let tmp_dir = tempdir().unwrap();
            let path = tmp_dir.path().join("masterlist.yaml");

            let metadata_list = MetadataDocument::default();
            metadata_list.save(&path).unwrap();

            assert_eq!("{}", std::fs::read_to_string(&path).unwrap());
        }

        #[test]
        fn should_round_trip_plugin_metadata() {
            let tmp_dir = tempdir().unwrap();
            let path = tmp_dir.path().join("masterlist.yaml");

            let mut metadata_list = MetadataDocument::default();

            let mut plugin = PluginMetadata::new("Blank.esp").unwrap();
            plugin.set_priority(7);
            plugin.set_tags(vec![Tag::new("Relev".into(), TagSuggestion::Addition)]);
            plugin.set_dirty_info(vec![PluginCleaningData::new(0xDEAD_BEEF, "utility".into())]);
            metadata_list.set_plugin_metadata(plugin);

            metadata_list.save(&path).unwrap();

            let mut reloaded = MetadataDocument::default();
            reloaded.load(&path).unwrap();

            let plugin = reloaded.find_plugin("Blank.esp").unwrap().unwrap();
            assert_eq!(7, plugin.priority());
            assert_eq!(1, plugin.tags().len());
            assert_eq!(1, plugin.dirty_info().len());
        }
    }

    mod find_plugin {
        use super::*;

        #[test]
        fn should_return_none_if_the_plugin_has_no_metadata() {
            let metadata_list = MetadataDocument::default();

            assert_eq!(None, metadata_list.find_plugin("Blank.esp").unwrap());
        }

        #[test]
        fn should_merge_metadata_from_matching_regex_entries() {
            let mut metadata_list = MetadataDocument::default();
            metadata_list.load_from_str(METADATA_LIST_YAML).unwrap();

            let plugin = metadata_list.find_plugin("Blank.esp").unwrap().unwrap();

            assert_eq!(Some("group2"), plugin.group());
            assert_eq!(1, plugin.load_after_files().len());
            assert_eq!(1, plugin.incompatibilities().len());
        }
    }

    mod set_groups {
        use super::*;

        #[test]
        fn should_insert_the_default_group_if_it_is_missing() {
            let mut metadata_list = MetadataDocument::default();

            metadata_list.set_groups(vec![Group::new("group1".into())]);

            assert_eq!(2, metadata_list.groups().len());
            assert_eq!(Group::DEFAULT_NAME, metadata_list.groups()[0].name());
        }

        #[test]
        fn should_not_duplicate_an_explicit_default_group() {
            let mut metadata_list = MetadataDocument::default();

            metadata_list.set_groups(vec![Group::default()]);

            assert_eq!(1, metadata_list.groups().len());
        }
    }

    mod remove_plugin_metadata {
        use super::*;

        #[test]
        fn should_remove_an_exact_entry() {
            let mut metadata_list = MetadataDocument::default();
            let mut plugin = PluginMetadata::new("Blank.esp").unwrap();
            plugin.set_priority(7);
            metadata_list.set_plugin_metadata(plugin);

            metadata_list.remove_plugin_metadata("Blank.esp");

            assert_eq!(None, metadata_list.find_plugin("Blank.esp").unwrap());
        }

        #[test]
        fn should_not_remove_a_regex_entry_when_given_its_literal_name() {
            let mut metadata_list = MetadataDocument::default();
            let mut plugin = PluginMetadata::new("Blank.+\\.esp").unwrap();
            plugin.set_priority(7);
            metadata_list.set_plugin_metadata(plugin);

            metadata_list.remove_plugin_metadata("Blank.esp");

            assert!(metadata_list.find_plugin("Blank.+\\.esp").unwrap().is_some());
        }
    }

    mod clear {
        use super::*;

        #[test]
        fn should_remove_all_metadata() {
            let mut metadata_list = MetadataDocument::default();
            metadata_list.load_from_str(METADATA_LIST_YAML).unwrap();

            metadata_list.clear();

            assert!(metadata_list.bash_tags().is_empty());
            assert!(metadata_list.groups().is_empty());
            assert!(metadata_list.messages().is_empty());
            assert_eq!(None, metadata_list.find_plugin("Blank.esm").unwrap());
        }
    }
}
