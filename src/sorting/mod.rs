mod dfs;
pub mod error;
pub mod groups;
pub mod plugins;
mod validate;
pub mod vertex;

#[cfg(test)]
mod test {
    use super::plugins::SortingPlugin;
    use crate::error::PluginDataError;

    #[derive(Default)]
    pub struct TestPlugin {
        name: String,
        masters: Vec<String>,
        pub(super) is_master: bool,
        pub(super) override_record_count: usize,
        overlapping_record_plugins: Vec<String>,
    }

    impl TestPlugin {
        pub fn new(name: &str) -> Self {
            Self {
                name: name.to_owned(),
                ..Default::default()
            }
        }

        pub fn add_master(&mut self, plugin_name: &str) {
            self.masters.push(plugin_name.to_owned());
        }

        pub fn add_overlapping_records(&mut self, plugin_name: &str) {
            self.overlapping_record_plugins.push(plugin_name.to_owned());
        }
    }

    impl SortingPlugin for TestPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_master(&self) -> bool {
            self.is_master
        }

        fn masters(&self) -> Result<Vec<String>, PluginDataError> {
            Ok(self.masters.clone())
        }

        fn override_record_count(&self) -> Result<usize, PluginDataError> {
            Ok(self.override_record_count)
        }

        fn do_records_overlap(&self, other: &Self) -> Result<bool, PluginDataError> {
            Ok(self.overlapping_record_plugins.contains(&other.name))
        }
    }
}
