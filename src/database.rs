use std::path::Path;

use crate::{
    logging,
    metadata::{
        File, Group, Message, PluginMetadata,
        error::{LoadMetadataError, RegexError, WriteMetadataError, WriteMetadataErrorReason},
        metadata_document::MetadataDocument,
    },
    sorting::{
        error::GroupsPathError,
        groups::{build_groups_graph, find_path},
        vertex::Vertex,
    },
};

/// The interface through which metadata can be accessed.
#[derive(Debug, Default)]
pub struct Database {
    masterlist: MetadataDocument,
    userlist: MetadataDocument,
    sort_messages: Vec<Message>,
}

impl Database {
    /// Loads the masterlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a masterlist.
    pub fn load_masterlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.masterlist.load(path)
    }

    /// Loads the userlist from the given path.
    ///
    /// Replaces any existing data that was previously loaded from a userlist.
    pub fn load_userlist(&mut self, path: &Path) -> Result<(), LoadMetadataError> {
        self.userlist.load(path)
    }

    /// Writes a metadata file containing all loaded user-added metadata.
    ///
    /// If `output_path` already exists, it will be written if `overwrite` is
    /// `true`, otherwise no data will be written.
    pub fn write_user_metadata(
        &self,
        output_path: &Path,
        overwrite: bool,
    ) -> Result<(), WriteMetadataError> {
        validate_write_path(output_path, overwrite)?;

        self.userlist.save(output_path)
    }

    /// Writes a metadata file that only contains plugin Bash Tag suggestions
    /// and dirty info.
    ///
    /// If `output_path` already exists, it will be written if `overwrite` is
    /// `true`, otherwise no data will be written.
    pub fn write_minimal_list(
        &self,
        output_path: &Path,
        overwrite: bool,
    ) -> Result<(), WriteMetadataError> {
        validate_write_path(output_path, overwrite)?;

        let mut doc = MetadataDocument::default();

        for plugin in self.masterlist.ordered_plugins_iter() {
            let Ok(mut minimal_plugin) = PluginMetadata::new(plugin.name()) else {
                continue;
            };
            minimal_plugin.set_tags(plugin.tags().to_vec());
            minimal_plugin.set_dirty_info(plugin.dirty_info().to_vec());

            doc.set_plugin_metadata(minimal_plugin);
        }

        doc.save(output_path)
    }

    /// Gets the Bash Tags that are listed in the loaded metadata lists.
    ///
    /// Bash Tag suggestions can include Bash Tags not in this list.
    pub fn known_bash_tags(&self) -> Vec<String> {
        let mut tags = self.masterlist.bash_tags().to_vec();
        tags.extend_from_slice(self.userlist.bash_tags());

        tags
    }

    /// Get all general messages listed in the loaded metadata lists.
    ///
    /// Conditions attached to messages are not evaluated: they are carried as
    /// opaque strings and it is up to the caller to interpret them.
    pub fn general_messages(&self) -> Vec<Message> {
        self.masterlist
            .messages()
            .iter()
            .chain(self.userlist.messages())
            .cloned()
            .collect()
    }

    /// Gets the groups that are defined in the loaded metadata lists.
    ///
    /// If `include_user_metadata` is `true`, any group metadata present in the
    /// userlist is included in the returned metadata, otherwise the metadata
    /// returned only includes metadata from the masterlist.
    pub fn groups(&self, include_user_metadata: bool) -> Vec<Group> {
        if include_user_metadata {
            merge_groups(self.masterlist.groups(), self.userlist.groups())
        } else {
            self.masterlist.groups().to_vec()
        }
    }

    /// Gets the groups that are defined or extended in the loaded userlist.
    pub fn user_groups(&self) -> &[Group] {
        self.userlist.groups()
    }

    /// Sets the group definitions to store in the userlist, replacing any
    /// definitions already loaded from the userlist.
    pub fn set_user_groups(&mut self, groups: Vec<Group>) {
        self.userlist.set_groups(groups);
    }

    /// Get the "shortest" path between the two given groups according to their
    /// "load after" metadata.
    ///
    /// The "shortest" path is defined as the path that maximises the amount of
    /// user metadata involved while minimising the amount of masterlist
    /// metadata involved. It's not the path involving the fewest groups.
    ///
    /// If there is no path between the two groups, the returned [Vec] will be
    /// empty.
    pub fn groups_path(
        &self,
        from_group_name: &str,
        to_group_name: &str,
    ) -> Result<Vec<Vertex>, GroupsPathError> {
        let graph = build_groups_graph(self.masterlist.groups(), self.userlist.groups())?;

        find_path(&graph, from_group_name, to_group_name)
    }

    /// Get all of a plugin's loaded metadata.
    ///
    /// If `include_user_metadata` is `true`, any user metadata the plugin has
    /// is included in the returned metadata, otherwise the metadata returned
    /// only includes metadata from the masterlist.
    pub fn plugin_metadata(
        &self,
        plugin_name: &str,
        include_user_metadata: bool,
    ) -> Result<Option<PluginMetadata>, RegexError> {
        let mut metadata = self.masterlist.find_plugin(plugin_name)?;

        if include_user_metadata {
            if let Some(mut user_metadata) = self.userlist.find_plugin(plugin_name)? {
                if let Some(metadata) = metadata {
                    user_metadata.merge_metadata(&metadata);
                }
                metadata = Some(user_metadata);
            }
        }

        Ok(metadata)
    }

    /// Get a plugin's metadata loaded from the given userlist.
    pub fn plugin_user_metadata(
        &self,
        plugin_name: &str,
    ) -> Result<Option<PluginMetadata>, RegexError> {
        self.userlist.find_plugin(plugin_name)
    }

    /// Sets a plugin's user metadata, replacing any loaded user metadata for
    /// that plugin.
    pub fn set_plugin_user_metadata(&mut self, plugin_metadata: PluginMetadata) {
        self.userlist.set_plugin_metadata(plugin_metadata);
    }

    /// Discards all loaded user metadata for the plugin with the given
    /// filename.
    pub fn discard_plugin_user_metadata(&mut self, plugin: &str) {
        self.userlist.remove_plugin_metadata(plugin);
    }

    /// Discards all loaded user metadata for all groups, plugins, and any
    /// user-added general messages and known bash tags.
    pub fn discard_all_user_metadata(&mut self) {
        self.userlist.clear();
    }

    /// Gets the diagnostic messages accumulated by the most recent call to
    /// [crate::Game::sort_plugins].
    pub fn sort_messages(&self) -> &[Message] {
        &self.sort_messages
    }

    /// Clears the sort message log, returning the messages it held so that
    /// they can be restored if the sort that triggered the clear fails.
    pub(crate) fn clear_sort_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.sort_messages)
    }

    /// Restores a previously cleared sort message log, used to roll back
    /// [Database::clear_sort_messages] when a sort fails partway through.
    pub(crate) fn restore_sort_messages(&mut self, messages: Vec<Message>) {
        self.sort_messages = messages;
    }

    pub(crate) fn push_sort_message(&mut self, message: Message) {
        if let Some(content) = message.content().first() {
            logging::debug!("{}", content.text());
        }
        self.sort_messages.push(message);
    }
}

fn validate_write_path(output_path: &Path, overwrite: bool) -> Result<(), WriteMetadataError> {
    if !output_path.parent().map(|p| p.exists()).unwrap_or(false) {
        Err(WriteMetadataError::new(
            output_path.to_path_buf(),
            WriteMetadataErrorReason::ParentDirectoryNotFound,
        ))
    } else if !overwrite && output_path.exists() {
        Err(WriteMetadataError::new(
            output_path.to_path_buf(),
            WriteMetadataErrorReason::PathAlreadyExists,
        ))
    } else if overwrite && output_path.exists() {
        std::fs::remove_file(output_path).map_err(|e| {
            WriteMetadataError::new(output_path.to_path_buf(), WriteMetadataErrorReason::IoError(e))
        })
    } else {
        Ok(())
    }
}

fn merge_groups(lhs: &[Group], rhs: &[Group]) -> Vec<Group> {
    let mut groups = lhs.to_vec();

    let mut new_groups = Vec::new();

    for rhs_group in rhs {
        if let Some(group) = groups.iter_mut().find(|g| g.name() == rhs_group.name()) {
            if rhs_group.description().is_some() || !rhs_group.after_groups().is_empty() {
                let mut new_group = group.clone();

                if let Some(description) = rhs_group.description() {
                    new_group = new_group.with_description(description.to_string());
                }

                if !rhs_group.after_groups().is_empty() {
                    let mut after_groups = new_group.after_groups().to_vec();
                    after_groups.extend_from_slice(rhs_group.after_groups());

                    new_group = new_group.with_after_groups(after_groups);
                }

                *group = new_group;
            }
        } else {
            new_groups.push(rhs_group.clone());
        }
    }

    groups.extend(new_groups);

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::metadata::Tag;

    fn database() -> Database {
        Database::default()
    }

    mod groups {
        use super::*;

        #[test]
        fn should_return_only_masterlist_groups_if_include_user_metadata_is_false() {
            let mut db = database();
            db.masterlist
                .set_groups(vec![Group::new("a".into()), Group::new("b".into())]);
            db.userlist.set_groups(vec![Group::new("c".into())]);

            let groups = db.groups(false);

            assert_eq!(2, groups.len());
        }

        #[test]
        fn should_merge_user_groups_when_include_user_metadata_is_true() {
            let mut db = database();
            db.masterlist.set_groups(vec![Group::new("a".into())]);
            db.userlist
                .set_groups(vec![Group::new("a".into()).with_after_groups(vec![
                    "default".into(),
                ])]);

            let groups = db.groups(true);

            let a = groups.iter().find(|g| g.name() == "a").unwrap();
            assert_eq!(&["default".to_string()], a.after_groups());
        }
    }

    mod plugin_metadata {
        use crate::tests::BLANK_ESM;

        use super::*;

        #[test]
        fn should_overlay_userlist_scalars_onto_masterlist() {
            let mut db = database();

            let mut masterlist_metadata = PluginMetadata::new(BLANK_ESM).unwrap();
            masterlist_metadata.set_priority(5);
            db.masterlist.set_plugin_metadata(masterlist_metadata);

            let mut userlist_metadata = PluginMetadata::new(BLANK_ESM).unwrap();
            userlist_metadata.set_tags(vec![Tag::new("Relev".into(), crate::metadata::TagSuggestion::Addition)]);
            db.userlist.set_plugin_metadata(userlist_metadata);

            let merged = db.plugin_metadata(BLANK_ESM, true).unwrap().unwrap();

            assert_eq!(5, merged.priority());
            assert_eq!(1, merged.tags().len());
        }

        #[test]
        fn should_only_use_masterlist_metadata_if_include_user_metadata_is_false() {
            let mut db = database();

            let mut masterlist_metadata = PluginMetadata::new(BLANK_ESM).unwrap();
            masterlist_metadata.set_priority(5);
            db.masterlist.set_plugin_metadata(masterlist_metadata);

            let mut userlist_metadata = PluginMetadata::new(BLANK_ESM).unwrap();
            userlist_metadata.set_priority(10);
            db.userlist.set_plugin_metadata(userlist_metadata);

            let merged = db.plugin_metadata(BLANK_ESM, false).unwrap().unwrap();

            assert_eq!(5, merged.priority());
        }
    }

    mod sort_messages {
        use super::*;

        #[test]
        fn clear_then_restore_should_bring_back_the_prior_messages() {
            let mut db = database();
            db.push_sort_message(Message::new(
                crate::metadata::MessageType::Warn,
                "hello".into(),
            ));

            let cleared = db.clear_sort_messages();
            assert!(db.sort_messages().is_empty());

            db.restore_sort_messages(cleared);
            assert_eq!(1, db.sort_messages().len());
        }

        #[test]
        fn clear_should_empty_the_message_log() {
            let mut db = database();
            db.push_sort_message(Message::new(
                crate::metadata::MessageType::Warn,
                "hello".into(),
            ));

            db.clear_sort_messages();

            assert!(db.sort_messages().is_empty());
        }
    }
}
