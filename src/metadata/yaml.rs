use saphyr::{AnnotatedArray, AnnotatedHash, MarkedYaml, Marker, Yaml, YamlData};

use super::error::{ExpectedType, ParseMetadataError};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum YamlObjectType {
    File,
    Group,
    Location,
    Message,
    MessageContent,
    PluginCleaningData,
    PluginMetadata,
    Tag,
    MetadataDocument,
}

impl std::fmt::Display for YamlObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YamlObjectType::File => write!(f, "file"),
            YamlObjectType::Group => write!(f, "group"),
            YamlObjectType::Location => write!(f, "location"),
            YamlObjectType::Message => write!(f, "message"),
            YamlObjectType::MessageContent => write!(f, "message content"),
            YamlObjectType::PluginCleaningData => write!(f, "plugin cleaning data"),
            YamlObjectType::PluginMetadata => write!(f, "plugin metadata"),
            YamlObjectType::Tag => write!(f, "tag"),
            YamlObjectType::MetadataDocument => write!(f, "metadata document"),
        }
    }
}

/// Strips source-location markers, producing a plain [Yaml] value suitable
/// for re-emitting in an error message.
pub fn to_unmarked_yaml(yaml: &MarkedYaml) -> Yaml {
    match &yaml.data {
        YamlData::Real(v) => Yaml::Real(v.clone()),
        YamlData::Integer(v) => Yaml::Integer(*v),
        YamlData::String(v) => Yaml::String(v.clone()),
        YamlData::Boolean(v) => Yaml::Boolean(*v),
        YamlData::Array(v) => Yaml::Array(to_array(v)),
        YamlData::Hash(v) => Yaml::Hash(to_hash(v)),
        YamlData::Alias(v) => Yaml::Alias(*v),
        YamlData::Null => Yaml::Null,
        YamlData::BadValue => Yaml::BadValue,
    }
}

fn to_array(array: &AnnotatedArray<MarkedYaml>) -> saphyr::Array {
    array.iter().map(to_unmarked_yaml).collect()
}

fn to_hash(hash: &AnnotatedHash<MarkedYaml>) -> saphyr::Hash {
    hash.iter()
        .map(|(key, value)| (to_unmarked_yaml(key), to_unmarked_yaml(value)))
        .collect()
}

pub fn as_string_node(value: &str) -> MarkedYaml {
    MarkedYaml {
        span: saphyr_parser::Span::default(),
        data: YamlData::String(value.into()),
    }
}

pub fn get_value<'a>(hash: &'a AnnotatedHash<MarkedYaml>, key: &str) -> Option<&'a MarkedYaml> {
    hash.get(&as_string_node(key))
}

pub fn get_string_value<'a>(
    hash: &'a AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<&'a str>, ParseMetadataError> {
    match hash.get(&as_string_node(key)) {
        Some(n) => match n.data.as_str() {
            Some(n) => Ok(Some(n)),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::String,
            )),
        },
        None => Ok(None),
    }
}

pub fn get_required_string_value<'a>(
    marker: Marker,
    hash: &'a AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<&'a str, ParseMetadataError> {
    match get_string_value(hash, key, yaml_type)? {
        Some(n) => Ok(n),
        None => Err(ParseMetadataError::missing_key(marker, key, yaml_type)),
    }
}

pub fn get_strings_vec_value<'a>(
    hash: &'a AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Vec<&'a str>, ParseMetadataError> {
    match hash.get(&as_string_node(key)) {
        Some(n) => match n.data.as_vec() {
            Some(n) => n
                .iter()
                .map(|e| match e.data.as_str() {
                    Some(s) => Ok(s),
                    None => Err(ParseMetadataError::unexpected_value_type(
                        e.span.start,
                        key,
                        yaml_type,
                        ExpectedType::String,
                    )),
                })
                .collect::<Result<Vec<_>, _>>(),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Array,
            )),
        },
        None => Ok(Vec::new()),
    }
}

pub fn get_as_hash(
    value: &MarkedYaml,
    yaml_type: YamlObjectType,
) -> Result<&AnnotatedHash<MarkedYaml>, ParseMetadataError> {
    match value.data.as_hash() {
        Some(h) => Ok(h),
        None => Err(ParseMetadataError::unexpected_type(
            value.span.start,
            yaml_type,
            ExpectedType::Map,
        )),
    }
}

pub fn get_i32_value(
    hash: &AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<i32>, ParseMetadataError> {
    match hash.get(&as_string_node(key)) {
        Some(n) => match n.data.as_i64() {
            Some(i) => i32::try_from(i)
                .map(Some)
                .map_err(|_| ParseMetadataError::non_i32_number(n.span.start, i)),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Number,
            )),
        },
        None => Ok(None),
    }
}

pub fn get_u32_value(
    hash: &AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<u32>, ParseMetadataError> {
    match hash.get(&as_string_node(key)) {
        Some(n) => match n.data.as_i64() {
            Some(i) => u32::try_from(i)
                .map(Some)
                .map_err(|_| ParseMetadataError::non_u32_number(n.span.start, i)),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Number,
            )),
        },
        None => Ok(None),
    }
}

pub fn get_bool_value(
    hash: &AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<Option<bool>, ParseMetadataError> {
    match hash.get(&as_string_node(key)) {
        Some(n) => match n.data.as_bool() {
            Some(b) => Ok(Some(b)),
            None => Err(ParseMetadataError::unexpected_value_type(
                n.span.start,
                key,
                yaml_type,
                ExpectedType::Boolean,
            )),
        },
        None => Ok(None),
    }
}

pub fn get_as_slice<'a>(
    hash: &'a AnnotatedHash<MarkedYaml>,
    key: &'static str,
    yaml_type: YamlObjectType,
) -> Result<&'a [MarkedYaml], ParseMetadataError> {
    if let Some(value) = hash.get(&as_string_node(key)) {
        match value.data.as_vec() {
            Some(n) => Ok(n.as_slice()),
            None => Err(ParseMetadataError::unexpected_value_type(
                value.span.start,
                key,
                yaml_type,
                ExpectedType::Array,
            )),
        }
    } else {
        Ok(&[])
    }
}

/// Reads an optional `condition` string.
///
/// Condition strings are carried unevaluated: evaluating them against
/// installed files or active plugins is out of scope for this crate, so
/// this only checks that the value is a string.
pub fn parse_condition(
    hash: &AnnotatedHash<MarkedYaml>,
    yaml_type: YamlObjectType,
) -> Result<Option<String>, ParseMetadataError> {
    Ok(get_string_value(hash, "condition", yaml_type)?.map(str::to_owned))
}
