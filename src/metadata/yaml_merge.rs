use std::sync::LazyLock;

use saphyr::{AnnotatedArray, AnnotatedHash, MarkedYaml, YamlData};

use super::{error::YamlMergeKeyError, yaml::as_string_node};

static MERGE_KEY: LazyLock<MarkedYaml> = LazyLock::new(|| as_string_node("<<"));

/// Resolves `<<` YAML merge keys, recursively.
pub fn process_merge_keys(mut yaml: MarkedYaml) -> Result<MarkedYaml, YamlMergeKeyError> {
    match yaml.data {
        YamlData::Array(a) => {
            yaml.data = merge_array_elements(a).map(YamlData::Array)?;
            Ok(yaml)
        }
        YamlData::Hash(h) => {
            yaml.data = merge_hash_keys(h).map(YamlData::Hash)?;
            Ok(yaml)
        }
        _ => Ok(yaml),
    }
}

fn merge_array_elements(
    array: AnnotatedArray<MarkedYaml>,
) -> Result<AnnotatedArray<MarkedYaml>, YamlMergeKeyError> {
    array.into_iter().map(process_merge_keys).collect()
}

fn merge_hash_keys(
    hash: AnnotatedHash<MarkedYaml>,
) -> Result<AnnotatedHash<MarkedYaml>, YamlMergeKeyError> {
    let mut hash: AnnotatedHash<MarkedYaml> = hash
        .into_iter()
        .map(|(key, value)| {
            process_merge_keys(key)
                .and_then(|key| process_merge_keys(value).map(|value| (key, value)))
        })
        .collect::<Result<_, _>>()?;

    if let Some(value) = hash.remove(&MERGE_KEY) {
        merge_into_hash(hash, value)
    } else {
        Ok(hash)
    }
}

fn merge_into_hash(
    hash: AnnotatedHash<MarkedYaml>,
    value: MarkedYaml,
) -> Result<AnnotatedHash<MarkedYaml>, YamlMergeKeyError> {
    match &value.data {
        YamlData::Array(a) => a.clone().into_iter().try_fold(hash, |acc, e| {
            if let YamlData::Hash(h) = e.data {
                Ok(merge_hashes(acc, h))
            } else {
                Err(YamlMergeKeyError::new(&e))
            }
        }),
        YamlData::Hash(h) => Ok(merge_hashes(hash, h.clone())),
        _ => Err(YamlMergeKeyError::new(&value)),
    }
}

fn merge_hashes(
    mut hash1: AnnotatedHash<MarkedYaml>,
    hash2: AnnotatedHash<MarkedYaml>,
) -> AnnotatedHash<MarkedYaml> {
    for (key, value) in hash2 {
        hash1.entry(key).or_insert(value);
    }
    hash1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::parse;

    #[test]
    fn should_leave_a_hash_with_no_merge_key_unchanged() {
        let yaml = parse("name: Blank.esp");

        let merged = process_merge_keys(yaml.clone()).unwrap();

        assert_eq!(yaml, merged);
    }

    #[test]
    fn should_merge_a_single_aliased_hash() {
        let yaml = parse(
            "
anchor: &anchor
  type: say
  content: test message
globals:
  - <<: *anchor
    condition: 'file(\"test.esp\")'
",
        );

        let merged = process_merge_keys(yaml).unwrap();

        let YamlData::Hash(hash) = &merged.data else {
            panic!("expected a hash");
        };
        let globals = hash.get(&as_string_node("globals")).unwrap();
        let YamlData::Array(globals) = &globals.data else {
            panic!("expected an array");
        };
        let merged_message = &globals[0];
        let YamlData::Hash(merged_message) = &merged_message.data else {
            panic!("expected a hash");
        };

        assert_eq!(
            Some("say"),
            merged_message
                .get(&as_string_node("type"))
                .and_then(|v| v.data.as_str())
        );
        assert_eq!(
            Some("test message"),
            merged_message
                .get(&as_string_node("content"))
                .and_then(|v| v.data.as_str())
        );
        assert_eq!(
            Some("file(\"test.esp\")"),
            merged_message
                .get(&as_string_node("condition"))
                .and_then(|v| v.data.as_str())
        );
    }

    #[test]
    fn should_error_if_the_merge_value_is_not_a_hash_or_array_of_hashes() {
        let yaml = parse("{<<: 'not a hash'}");

        assert!(process_merge_keys(yaml).is_err());
    }
}
