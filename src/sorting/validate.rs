use std::collections::HashSet;

use unicase::UniCase;

use crate::{
    EdgeType, Vertex, logging,
    sorting::error::{
        CyclicInteractionError, InvalidMetadataError, PluginGraphValidationError,
        UndefinedGroupError,
    },
};

use super::{
    groups::GroupsGraph,
    plugins::{PluginSortingData, SortingPlugin},
};

pub fn validate_plugin_groups<T: SortingPlugin>(
    plugins_sorting_data: &[PluginSortingData<'_, T>],
    groups_graph: &GroupsGraph,
) -> Result<(), UndefinedGroupError> {
    let group_names: HashSet<&str> = groups_graph
        .node_indices()
        .map(|i| groups_graph[i].as_ref())
        .collect();

    for plugin in plugins_sorting_data {
        if !group_names.contains(plugin.group.as_ref()) {
            return Err(UndefinedGroupError::new(plugin.group.clone().into_string()));
        }
    }

    Ok(())
}

/// Checks that no plugin names itself in its own load-after or requirement
/// metadata, which would otherwise silently become a self-loop edge once the
/// graph is built.
pub fn validate_no_self_references<T: SortingPlugin>(
    plugins_sorting_data: &[PluginSortingData<'_, T>],
) -> Result<(), InvalidMetadataError> {
    for plugin in plugins_sorting_data {
        let own_name = UniCase::new(plugin.name());

        let self_referencing = plugin
            .masterlist_load_after
            .iter()
            .chain(plugin.user_load_after.iter())
            .chain(plugin.masterlist_req.iter())
            .chain(plugin.user_req.iter())
            .any(|name| UniCase::new(name.as_str()) == own_name);

        if self_referencing {
            return Err(InvalidMetadataError::new(format!(
                "\"{}\" has a load after or requirement entry that references itself",
                plugin.name()
            )));
        }
    }

    Ok(())
}

/// Checks that no master plugin declares a non-master as one of its file
/// header masters or metadata load-after/requirement targets, which would
/// otherwise create a cycle once the master/non-master partition edge is
/// added.
pub fn validate_specific_edges<T: SortingPlugin>(
    masters: &[PluginSortingData<'_, T>],
    non_masters: &[PluginSortingData<'_, T>],
) -> Result<(), PluginGraphValidationError> {
    logging::trace!("Validating master/non-master plugin edges...");

    let non_masters_set: HashSet<UniCase<&str>> =
        non_masters.iter().map(|p| UniCase::new(p.name())).collect();

    masters.iter().try_for_each(|m| validate_plugin(m, &non_masters_set))
}

fn validate_plugin<T: SortingPlugin>(
    plugin: &PluginSortingData<'_, T>,
    non_masters: &HashSet<UniCase<&str>>,
) -> Result<(), PluginGraphValidationError> {
    for master in plugin.masters()? {
        let key = UniCase::new(master.as_str());
        if non_masters.contains(&key) {
            return Err(CyclicInteractionError::new(vec![
                Vertex::new(master).with_out_edge_type(EdgeType::Master),
                Vertex::new(plugin.name().to_owned()).with_out_edge_type(EdgeType::MasterFlag),
            ])
            .into());
        }
    }

    validate_files(
        &plugin.masterlist_req,
        plugin.name(),
        non_masters,
        EdgeType::MasterlistRequirement,
    )?;

    validate_files(
        &plugin.user_req,
        plugin.name(),
        non_masters,
        EdgeType::UserRequirement,
    )?;

    validate_files(
        &plugin.masterlist_load_after,
        plugin.name(),
        non_masters,
        EdgeType::MasterlistLoadAfter,
    )?;

    validate_files(
        &plugin.user_load_after,
        plugin.name(),
        non_masters,
        EdgeType::UserLoadAfter,
    )?;

    Ok(())
}

fn validate_files(
    files: &[String],
    plugin_name: &str,
    non_masters: &HashSet<UniCase<&str>>,
    edge_type: EdgeType,
) -> Result<(), CyclicInteractionError> {
    for file in files {
        let key = UniCase::new(file.as_str());
        if non_masters.contains(&key) {
            return Err(CyclicInteractionError::new(vec![
                Vertex::new(file.clone()).with_out_edge_type(edge_type),
                Vertex::new(plugin_name.to_owned()).with_out_edge_type(EdgeType::MasterFlag),
            ]));
        }
    }

    Ok(())
}
