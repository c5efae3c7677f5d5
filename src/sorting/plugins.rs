use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;

use petgraph::{Graph, graph::NodeIndex, visit::EdgeRef};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use unicase::UniCase;

use crate::{
    EdgeType, LogLevel, Plugin,
    logging::{self, is_log_enabled},
    metadata::{File, Group, PluginMetadata},
    plugin::error::PluginDataError,
};

use super::{
    dfs::{BidirBfsVisitor, DfsVisitor, bidirectional_bfs, depth_first_search, find_cycle},
    error::{CyclicInteractionError, SortingError, UndefinedGroupError},
    groups::{GroupsGraph, get_default_group_node, sorted_group_nodes},
    validate::{validate_no_self_references, validate_plugin_groups, validate_specific_edges},
};

#[derive(Debug)]
pub struct PluginSortingData<'a, T: SortingPlugin> {
    plugin: &'a T,
    pub(super) is_master: bool,
    override_record_count: usize,

    priority: i32,
    priority_is_global: bool,

    pub(super) group: Box<str>,
    group_is_user_metadata: bool,
    pub(crate) masterlist_load_after: Box<[String]>,
    pub(crate) user_load_after: Box<[String]>,
    pub(crate) masterlist_req: Box<[String]>,
    pub(crate) user_req: Box<[String]>,
}

impl<'a, T: SortingPlugin> PluginSortingData<'a, T> {
    pub fn new(
        plugin: &'a T,
        masterlist_metadata: Option<&PluginMetadata>,
        user_metadata: Option<&PluginMetadata>,
    ) -> Result<Self, PluginDataError> {
        let override_record_count = plugin.override_record_count()?;

        // A plugin's user metadata entry takes precedence over its masterlist
        // entry wholesale: if one exists it's taken as authoritative for
        // priority.
        let priority = user_metadata
            .map(PluginMetadata::priority)
            .unwrap_or_else(|| masterlist_metadata.map_or(0, PluginMetadata::priority));

        let priority_is_global = user_metadata
            .map(PluginMetadata::priority_is_global)
            .unwrap_or_else(|| masterlist_metadata.is_some_and(PluginMetadata::priority_is_global));

        Ok(Self {
            plugin,
            is_master: plugin.is_master(),
            override_record_count,
            priority,
            priority_is_global,
            group: user_metadata
                .and_then(PluginMetadata::group)
                .or_else(|| masterlist_metadata.and_then(PluginMetadata::group))
                .unwrap_or(Group::DEFAULT_NAME)
                .into(),
            group_is_user_metadata: user_metadata.and_then(PluginMetadata::group).is_some(),
            masterlist_load_after: masterlist_metadata
                .map(|m| to_filenames(m.load_after_files()))
                .unwrap_or_default(),
            user_load_after: user_metadata
                .map(|m| to_filenames(m.load_after_files()))
                .unwrap_or_default(),
            masterlist_req: masterlist_metadata
                .map(|m| to_filenames(m.requirements()))
                .unwrap_or_default(),
            user_req: user_metadata
                .map(|m| to_filenames(m.requirements()))
                .unwrap_or_default(),
        })
    }

    pub(super) fn name(&self) -> &str {
        self.plugin.name()
    }

    pub(super) fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        self.plugin.masters()
    }

    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
        self.plugin.do_records_overlap(other.plugin)
    }
}

/// The plugin data that sorting needs. Implemented for [Plugin] and for a
/// lightweight fixture type used in tests.
pub trait SortingPlugin {
    fn name(&self) -> &str;
    fn is_master(&self) -> bool;
    fn masters(&self) -> Result<Vec<String>, PluginDataError>;
    fn override_record_count(&self) -> Result<usize, PluginDataError>;
    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError>;
}

impl SortingPlugin for Plugin {
    fn name(&self) -> &str {
        self.name()
    }

    fn is_master(&self) -> bool {
        self.is_master()
    }

    fn masters(&self) -> Result<Vec<String>, PluginDataError> {
        self.masters()
    }

    fn override_record_count(&self) -> Result<usize, PluginDataError> {
        self.override_record_count()
    }

    fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
        self.do_records_overlap(other)
    }
}

fn to_filenames(files: &[File]) -> Box<[String]> {
    files.iter().map(|f| f.name().as_str().to_owned()).collect()
}

type InnerPluginsGraph<'a, T> = Graph<Rc<PluginSortingData<'a, T>>, EdgeType>;

#[derive(Debug)]
struct PluginsGraph<'a, T: SortingPlugin> {
    // Sorting data is stored in an Rc so that a node's data can still be read
    // while other nodes' edges are being mutated.
    inner: InnerPluginsGraph<'a, T>,
    paths_cache: HashMap<NodeIndex, HashSet<NodeIndex>>,
}

impl<'a, T: SortingPlugin> PluginsGraph<'a, T> {
    fn new() -> Self {
        PluginsGraph::default()
    }

    fn add_node(&mut self, plugin: PluginSortingData<'a, T>) -> NodeIndex {
        self.inner.add_node(Rc::new(plugin))
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge_type: EdgeType) {
        if self.is_path_cached(from, to) {
            return;
        }

        logging::debug!(
            "Adding {} edge from \"{}\" to \"{}\".",
            edge_type,
            self.inner[from].name(),
            self.inner[to].name()
        );

        self.inner.add_edge(from, to, edge_type);

        self.cache_path(from, to);
    }

    fn node_indices(&self) -> petgraph::graph::NodeIndices {
        self.inner.node_indices()
    }

    fn add_specific_edges(&mut self) -> Result<(), SortingError> {
        logging::trace!("Adding edges based on plugin data and non-group metadata...");

        let mut node_index_iter = self.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(&self[node_index]);

            for master in plugin.masters()? {
                if let Some(other_node_index) = self.node_index_by_name(&master) {
                    self.add_edge(other_node_index, node_index, EdgeType::Master);
                }
            }

            for file in &plugin.masterlist_req {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(
                        other_node_index,
                        node_index,
                        EdgeType::MasterlistRequirement,
                    );
                }
            }

            for file in &plugin.user_req {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(other_node_index, node_index, EdgeType::UserRequirement);
                }
            }

            for file in &plugin.masterlist_load_after {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(other_node_index, node_index, EdgeType::MasterlistLoadAfter);
                }
            }

            for file in &plugin.user_load_after {
                if let Some(other_node_index) = self.node_index_by_name(file) {
                    self.add_edge(other_node_index, node_index, EdgeType::UserLoadAfter);
                }
            }
        }

        // Plugins are sorted into master and non-master partitions before
        // this is called, so there's no need to add master flag edges here:
        // every node in a given graph shares the same master flag value.

        Ok(())
    }

    fn check_for_cycles(&mut self) -> Result<(), CyclicInteractionError> {
        if let Some(cycle) = find_cycle(&self.inner, |node| node.name().to_owned()) {
            Err(CyclicInteractionError::new(cycle))
        } else {
            Ok(())
        }
    }

    fn add_group_edges(&mut self, groups_graph: &GroupsGraph) -> Result<(), UndefinedGroupError> {
        logging::trace!("Adding edges based on plugin group memberships...");

        let plugins_in_groups = get_plugins_in_groups(&self.inner);

        let default_group_node = get_default_group_node(groups_graph)?;

        // Keep a record of which vertices have already been fully explored to
        // avoid adding edges from their plugins more than once.
        let mut finished_nodes = HashSet::default();

        // Run a DFS from each vertex in the group graph, adding edges except
        // from plugins in the default group. This could be run only on the
        // root vertices, except that the DFS only visits each vertex once, so
        // a branch and merge inside a given root's DAG would result in
        // plugins from one of the branches not being carried forwards past
        // the point at which the branches merge.
        for group_node in sorted_group_nodes(groups_graph) {
            let mut visitor = GroupsPathVisitor::new(
                self,
                groups_graph,
                &plugins_in_groups,
                &mut finished_nodes,
                Some(default_group_node),
            );

            depth_first_search(
                groups_graph,
                &mut HashMap::default(),
                group_node,
                &mut visitor,
            );
        }

        // Now do one last DFS starting from the default group and not
        // ignoring its plugins.
        let mut visitor = GroupsPathVisitor::new(
            self,
            groups_graph,
            &plugins_in_groups,
            &mut finished_nodes,
            None,
        );

        depth_first_search(
            groups_graph,
            &mut HashMap::default(),
            default_group_node,
            &mut visitor,
        );

        Ok(())
    }

    /// Computes each plugin's effective priority: the maximum, over itself
    /// and all ancestors reachable via the edges added so far, of declared
    /// priorities. Must be called after `add_specific_edges`/`add_group_edges`
    /// and before any `Priority` or `RecordOverlap` edges are added, since
    /// those aren't part of the ancestor relationship priorities propagate
    /// through.
    fn propagate_priorities(&self) -> HashMap<NodeIndex, (i32, bool)> {
        logging::trace!("Propagating priorities...");

        let mut effective: HashMap<NodeIndex, (i32, bool)> = self
            .node_indices()
            .map(|i| (i, (self[i].priority, self[i].priority_is_global)))
            .collect();

        let mut queue: VecDeque<NodeIndex> = self.node_indices().collect();
        let mut queued: HashSet<NodeIndex> = queue.iter().copied().collect();

        while let Some(node_index) = queue.pop_front() {
            queued.remove(&node_index);

            let (priority, is_global) = effective[&node_index];

            for target_index in self.inner.neighbors(node_index) {
                let (target_priority, target_is_global) = effective[&target_index];

                let new_priority = priority.max(target_priority);
                let new_is_global = is_global || target_is_global;

                if new_priority != target_priority || new_is_global != target_is_global {
                    effective.insert(target_index, (new_priority, new_is_global));

                    if queued.insert(target_index) {
                        queue.push_back(target_index);
                    }
                }
            }
        }

        effective
    }

    fn add_priority_edges(
        &mut self,
        effective_priorities: &HashMap<NodeIndex, (i32, bool)>,
    ) -> Result<(), SortingError> {
        logging::trace!("Adding priority edges...");

        let mut node_index_iter = self.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(&self[node_index]);
            let (priority, is_global) = effective_priorities[&node_index];

            for other_node_index in node_index_iter.clone() {
                let (other_priority, other_is_global) = effective_priorities[&other_node_index];

                if priority == other_priority {
                    continue;
                }

                if self.inner.contains_edge(node_index, other_node_index)
                    || self.inner.contains_edge(other_node_index, node_index)
                {
                    continue;
                }

                let other_plugin = &self[other_node_index];

                let applicable =
                    (is_global && other_is_global) || plugin.do_records_overlap(other_plugin)?;

                if !applicable {
                    continue;
                }

                let (from_index, to_index) = if priority < other_priority {
                    (node_index, other_node_index)
                } else {
                    (other_node_index, node_index)
                };

                if !self.is_path_cached(from_index, to_index) {
                    if self.path_exists(to_index, from_index) {
                        logging::debug!(
                            "Skipping Priority edge from \"{}\" to \"{}\" as it would create a cycle.",
                            self[from_index].name(),
                            self[to_index].name()
                        );
                    } else {
                        self.add_edge(from_index, to_index, EdgeType::Priority);
                    }
                }
            }
        }

        Ok(())
    }

    fn add_overlap_edges(&mut self) -> Result<(), SortingError> {
        logging::trace!("Adding edges for overlapping plugins...");

        let mut node_index_iter = self.node_indices();
        while let Some(node_index) = node_index_iter.next() {
            let plugin = Rc::clone(&self[node_index]);

            if plugin.override_record_count == 0 {
                logging::debug!(
                    "Skipping vertex for \"{}\": the plugin contains no override records",
                    plugin.name()
                );
                continue;
            }

            for other_node_index in node_index_iter.clone() {
                let other_plugin = &self[other_node_index];

                if other_plugin.override_record_count == 0 {
                    continue;
                }

                // Don't add an edge between these two plugins if one already
                // exists (only check direct edges and not paths for efficiency).
                if self.inner.contains_edge(node_index, other_node_index)
                    || self.inner.contains_edge(other_node_index, node_index)
                {
                    continue;
                }

                if !plugin.do_records_overlap(other_plugin)? {
                    continue;
                }

                let plugin_loads_first = match plugin
                    .override_record_count
                    .cmp(&other_plugin.override_record_count)
                {
                    std::cmp::Ordering::Greater => true,
                    std::cmp::Ordering::Less => false,
                    std::cmp::Ordering::Equal => {
                        UniCase::new(plugin.name()) <= UniCase::new(other_plugin.name())
                    }
                };

                let (from_index, to_index) = if plugin_loads_first {
                    (node_index, other_node_index)
                } else {
                    (other_node_index, node_index)
                };

                if !self.is_path_cached(from_index, to_index) {
                    if self.path_exists(to_index, from_index) {
                        logging::debug!(
                            "Skipping Record Overlap edge from \"{}\" to \"{}\" as it would create a cycle.",
                            self[from_index].name(),
                            self[to_index].name()
                        );
                    } else {
                        self.add_edge(from_index, to_index, EdgeType::RecordOverlap);
                    }
                }
            }
        }

        Ok(())
    }

    /// Performs a Kahn's-algorithm topological sort, using a min-heap to
    /// break ties between ready vertices deterministically (masters before
    /// non-masters, higher effective priority first, then ascending canonical
    /// name), so that the same input always produces the same output.
    fn topological_sort(
        &self,
        effective_priorities: &HashMap<NodeIndex, (i32, bool)>,
    ) -> Result<Vec<NodeIndex>, SortingError> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .node_indices()
            .map(|i| {
                (
                    i,
                    self.inner
                        .edges_directed(i, petgraph::Direction::Incoming)
                        .count(),
                )
            })
            .collect();

        let mut heap: BinaryHeap<HeapEntry> = self
            .node_indices()
            .filter(|i| in_degree[i] == 0)
            .map(|i| self.heap_entry(i, effective_priorities))
            .collect();

        let mut sorted = Vec::with_capacity(self.inner.node_count());

        while let Some(entry) = heap.pop() {
            let node_index = entry.node_index;
            sorted.push(node_index);

            for edge in self.inner.edges(node_index) {
                let target = edge.target();
                if let Some(degree) = in_degree.get_mut(&target) {
                    *degree -= 1;
                    if *degree == 0 {
                        heap.push(self.heap_entry(target, effective_priorities));
                    }
                }
            }
        }

        if sorted.len() == self.inner.node_count() {
            Ok(sorted)
        } else if let Some(cycle) = find_cycle(&self.inner, |node| node.name().to_owned()) {
            logging::error!("Cyclic interaction detected while sorting plugins");
            Err(SortingError::CycleFound(CyclicInteractionError::new(
                cycle,
            )))
        } else {
            logging::error!("A cycle was detected by Kahn's algorithm but could not be located");
            Err(SortingError::CycleInvolving("<unknown plugin>".into()))
        }
    }

    fn heap_entry(
        &self,
        node_index: NodeIndex,
        effective_priorities: &HashMap<NodeIndex, (i32, bool)>,
    ) -> HeapEntry {
        let plugin = &self[node_index];

        HeapEntry {
            node_index,
            is_master: plugin.is_master,
            priority: effective_priorities[&node_index].0,
            folded_name: plugin.name().to_lowercase(),
        }
    }

    fn cache_path(&mut self, from: NodeIndex, to: NodeIndex) {
        self.paths_cache.entry(from).or_default().insert(to);
    }

    fn is_path_cached(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.paths_cache
            .get(&from)
            .is_some_and(|s| s.contains(&to))
    }

    fn node_index_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.node_indices()
            .find(|i| unicase::eq(self[*i].name(), name))
    }

    fn path_exists(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if self.is_path_cached(from, to) {
            return true;
        }

        let mut visitor = PathCacher::new(&mut self.paths_cache, from, to);

        bidirectional_bfs(&self.inner, from, to, &mut visitor)
    }
}

/// Ordered so that `BinaryHeap::pop` returns the vertex that should be placed
/// next in the sorted output: masters before non-masters, higher effective
/// priority first, then ascending folded name.
#[derive(Debug, Eq, PartialEq)]
struct HeapEntry {
    node_index: NodeIndex,
    is_master: bool,
    priority: i32,
    folded_name: String,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.is_master
            .cmp(&other.is_master)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.folded_name.cmp(&self.folded_name))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// The derive macro for Default requires T: Default, but that's not actually
// necessary here.
impl<T: SortingPlugin> std::default::Default for PluginsGraph<'_, T> {
    fn default() -> Self {
        Self {
            inner: Graph::default(),
            paths_cache: HashMap::default(),
        }
    }
}

impl<'a, T: SortingPlugin> std::ops::Index<NodeIndex> for PluginsGraph<'a, T> {
    type Output = Rc<PluginSortingData<'a, T>>;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.inner[index]
    }
}

pub fn sort_plugins<T: SortingPlugin>(
    plugins_sorting_data: Vec<PluginSortingData<T>>,
    groups_graph: &GroupsGraph,
) -> Result<Vec<String>, SortingError> {
    if plugins_sorting_data.is_empty() {
        return Ok(Vec::new());
    }

    validate_plugin_groups(&plugins_sorting_data, groups_graph)?;
    validate_no_self_references(&plugins_sorting_data)?;

    // Sort by name first so that vertex iteration order - and so the edges
    // that end up getting added - is independent of the input plugin order.
    // Without this, sorting and then applying the result could change the
    // outcome of sorting again.
    let mut plugins_sorting_data = plugins_sorting_data;
    plugins_sorting_data.sort_by(|a, b| a.name().cmp(b.name()));

    // Some parts of sorting are O(N^2) for N plugins, and master flags would
    // otherwise cause O(M*N) edges to be added for M masters and N
    // non-masters. Sorting masters and non-masters in two separate graphs
    // avoids that, at the cost of not being able to create cyclic
    // interaction errors that span both: edges from a non-master to a master
    // (or vice versa) are effectively ignored, but that shouldn't have a
    // noticeable impact given that the file header master flag already fully
    // orders the two partitions relative to each other.
    let (masters, non_masters): (Vec<_>, Vec<_>) =
        plugins_sorting_data.into_iter().partition(|p| p.is_master);

    validate_specific_edges(&masters, &non_masters)?;

    let mut masters_load_order = sort_plugins_partition(masters, groups_graph)?;

    let non_masters_load_order = sort_plugins_partition(non_masters, groups_graph)?;

    masters_load_order.extend(non_masters_load_order);

    Ok(masters_load_order)
}

fn sort_plugins_partition<T: SortingPlugin>(
    plugins_sorting_data: Vec<PluginSortingData<T>>,
    groups_graph: &GroupsGraph,
) -> Result<Vec<String>, SortingError> {
    let mut graph = PluginsGraph::new();

    for plugin in plugins_sorting_data {
        graph.add_node(plugin);
    }

    graph.add_specific_edges()?;

    // Check for cycles now because from this point on edges are only added
    // if they don't cause cycles, and adding priority and overlap edges is
    // relatively slow, so checking now provides quicker feedback if there is
    // an issue.
    graph.check_for_cycles()?;

    graph.add_group_edges(groups_graph)?;

    let effective_priorities = graph.propagate_priorities();

    graph.add_priority_edges(&effective_priorities)?;
    graph.add_overlap_edges()?;

    let sorted_nodes = graph.topological_sort(&effective_priorities)?;

    let sorted_plugin_names = sorted_nodes
        .into_iter()
        .map(|i| graph[i].name().to_owned())
        .collect();

    Ok(sorted_plugin_names)
}

fn get_plugins_in_groups<T: SortingPlugin>(
    graph: &InnerPluginsGraph<T>,
) -> HashMap<Box<str>, Vec<NodeIndex>> {
    let mut plugins_in_groups: HashMap<Box<str>, Vec<NodeIndex>> = HashMap::default();

    for node in graph.node_indices() {
        let group_name = graph[node].group.clone();

        plugins_in_groups.entry(group_name).or_default().push(node);
    }

    if is_log_enabled(LogLevel::Debug) {
        logging::debug!("Found the following plugins in groups:");

        let mut group_names: Vec<_> = plugins_in_groups.keys().collect();
        group_names.sort();

        for group_name in group_names {
            let plugin_names: Vec<_> = plugins_in_groups
                .get(group_name)
                .into_iter()
                .flatten()
                .map(|i| format!("\"{}\"", graph[*i].name()))
                .collect();

            logging::debug!("\t{}: {}", group_name, plugin_names.join(", "));
        }
    }

    plugins_in_groups
}

#[derive(Debug)]
struct PathCacher<'a> {
    cache: &'a mut HashMap<NodeIndex, HashSet<NodeIndex>>,
    from_node_index: NodeIndex,
    to_node_index: NodeIndex,
}

impl<'a> PathCacher<'a> {
    fn new(
        cache: &'a mut HashMap<NodeIndex, HashSet<NodeIndex>>,
        from_node_index: NodeIndex,
        to_node_index: NodeIndex,
    ) -> Self {
        Self {
            cache,
            from_node_index,
            to_node_index,
        }
    }

    fn cache_path(&mut self, from: NodeIndex, to: NodeIndex) {
        self.cache.entry(from).or_default().insert(to);
    }
}

impl BidirBfsVisitor for PathCacher<'_> {
    fn visit_forward_bfs_edge(&mut self, _: NodeIndex, target: NodeIndex) {
        self.cache_path(self.from_node_index, target);
    }

    fn visit_reverse_bfs_edge(&mut self, source: NodeIndex, _: NodeIndex) {
        self.cache_path(source, self.to_node_index);
    }

    fn visit_intersection_node(&mut self, _: NodeIndex) {}
}

type PluginNodeIndex = NodeIndex;
type GroupNodeIndex = NodeIndex;

struct GroupsPathVisitor<'a, 'b, 'c, 'd, 'e, T: SortingPlugin> {
    plugins_graph: &'a mut PluginsGraph<'b, T>,
    groups_graph: &'e GroupsGraph,
    groups_plugins: &'c HashMap<Box<str>, Vec<PluginNodeIndex>>,
    finished_group_vertices: &'d mut HashSet<GroupNodeIndex>,
    group_node_to_ignore_as_source: Option<GroupNodeIndex>,
    edge_stack: Vec<(
        petgraph::graph::EdgeReference<'e, EdgeType>,
        &'c [PluginNodeIndex],
    )>,
    unfinishable_nodes: HashSet<GroupNodeIndex>,
}

impl<'a, 'b, 'c, 'd, 'e, T: SortingPlugin> GroupsPathVisitor<'a, 'b, 'c, 'd, 'e, T> {
    fn new(
        plugins_graph: &'a mut PluginsGraph<'b, T>,
        groups_graph: &'e GroupsGraph,
        groups_plugins: &'c HashMap<Box<str>, Vec<PluginNodeIndex>>,
        finished_group_vertices: &'d mut HashSet<GroupNodeIndex>,
        group_node_to_ignore_as_source: Option<GroupNodeIndex>,
    ) -> Self {
        Self {
            plugins_graph,
            groups_graph,
            groups_plugins,
            finished_group_vertices,
            group_node_to_ignore_as_source,
            edge_stack: Vec::new(),
            unfinishable_nodes: HashSet::default(),
        }
    }

    fn should_ignore_source_node(&self, node_index: GroupNodeIndex) -> bool {
        self.group_node_to_ignore_as_source == Some(node_index)
            || self.finished_group_vertices.contains(&node_index)
    }

    fn find_plugins_in_group(&self, node_index: GroupNodeIndex) -> &'c [PluginNodeIndex] {
        self.groups_plugins
            .get(self.groups_graph[node_index].as_ref())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn add_plugin_graph_edges(&mut self, edge_stack_index: usize, target_plugins: &[PluginNodeIndex]) {
        let Some([from_edge, edges @ ..]) = self.edge_stack.get(edge_stack_index..) else {
            logging::error!(
                "Unexpectedly invalid edge stack index {} for an edge stack of length {}",
                edge_stack_index,
                self.edge_stack.len()
            );
            return;
        };

        let path_involves_user_metadata = std::iter::once(from_edge)
            .chain(edges.iter())
            .any(|e| *e.0.weight() == EdgeType::UserLoadAfter);

        for from_plugin in from_edge.1 {
            self.add_edges_from_plugin(*from_plugin, target_plugins, path_involves_user_metadata);
        }
    }

    fn add_edges_from_plugin(
        &mut self,
        from_plugin: PluginNodeIndex,
        to_plugins: &[PluginNodeIndex],
        path_involves_user_metadata: bool,
    ) {
        for to_plugin in to_plugins {
            if self.plugins_graph.is_path_cached(from_plugin, *to_plugin) {
                continue;
            }

            let involves_user_metadata = path_involves_user_metadata
                || self.plugins_graph[from_plugin].group_is_user_metadata
                || self.plugins_graph[*to_plugin].group_is_user_metadata;

            let edge_type = if involves_user_metadata {
                EdgeType::UserGroup
            } else {
                EdgeType::MasterlistGroup
            };

            if self.plugins_graph.path_exists(*to_plugin, from_plugin) {
                logging::debug!(
                    "Skipping a \"{}\" edge from \"{}\" to \"{}\" as it would create a cycle.",
                    edge_type,
                    self.plugins_graph[from_plugin].name(),
                    self.plugins_graph[*to_plugin].name()
                );
            } else {
                self.plugins_graph
                    .add_edge(from_plugin, *to_plugin, edge_type);
            }
        }
    }
}

impl<'e, T: SortingPlugin> DfsVisitor<'e> for GroupsPathVisitor<'_, '_, '_, '_, 'e, T> {
    fn visit_tree_edge(&mut self, edge_ref: petgraph::graph::EdgeReference<'e, EdgeType>) {
        let source = edge_ref.source();
        let target = edge_ref.target();

        // Record the plugins in the edge's source group, unless the source
        // group should be ignored (e.g. because this visitor is configured to
        // ignore the default group's plugins as a source).
        let edge_plugins = if self.should_ignore_source_node(source) {
            &[]
        } else {
            self.find_plugins_in_group(source)
        };
        self.edge_stack.push((edge_ref, edge_plugins));

        let target_plugins = self.find_plugins_in_group(target);

        // Add edges going from all the plugins in the groups in the path
        // currently being walked to the plugins in the target group.
        for i in 0..self.edge_stack.len() {
            self.add_plugin_graph_edges(i, target_plugins);
        }
    }

    fn visit_forward_or_cross_edge(
        &mut self,
        edge_ref: petgraph::graph::EdgeReference<'e, EdgeType>,
    ) {
        // Mark the source vertex and all edges in the current stack as
        // unfinishable, because none of the plugins in the path so far can
        // have edges added to plugins past the target vertex.
        logging::debug!(
            "Found groups graph forward or cross \"{}\" edge going from \"{}\" to \"{}\"",
            edge_ref.weight(),
            self.groups_graph[edge_ref.source()],
            self.groups_graph[edge_ref.target()]
        );

        let sources = self
            .edge_stack
            .iter()
            .map(|e| e.0.source())
            .chain(std::iter::once(edge_ref.source()));

        for source in sources {
            if self.unfinishable_nodes.insert(source) {
                logging::debug!("Treating \"{}\" as unfinishable", self.groups_graph[source]);
            }
        }
    }

    fn visit_back_edge(&mut self, _: petgraph::graph::EdgeReference<'e, EdgeType>) {}

    fn discover_node(&mut self, _: GroupNodeIndex) {}

    fn finish_node(&mut self, node_index: GroupNodeIndex) {
        // Now that this vertex's DFS-tree has been fully explored, mark it as
        // finished so that it won't have edges added from its plugins again
        // in a different DFS that uses the same finished vertices set.
        if self.group_node_to_ignore_as_source != Some(node_index)
            && !self.unfinishable_nodes.contains(&node_index)
            && self.finished_group_vertices.insert(node_index)
        {
            logging::debug!(
                "Recorded groups graph vertex \"{}\" as finished",
                self.groups_graph[node_index]
            );
        }

        // Since this vertex has been fully explored, pop the edge stack to
        // remove the edge that has this vertex as its target.
        self.edge_stack.pop();
    }
}
