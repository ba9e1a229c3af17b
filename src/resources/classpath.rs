use crate::resources::store::ResourceStore;

pub const CLASSPATH_DELIMITER: char = ',';

/// Splits a comma separated classpath for lookups: entries are trimmed and lower-cased.
/// An empty string yields no entries.
pub fn split_class_paths(value: &str) -> Vec<String> {
    parse_class_path(&value.to_lowercase())
}

/// Splits a configured classpath for execution. Case is kept because the entries name
/// directories; order and duplicates are kept as well.
pub fn parse_class_path(value: &str) -> Vec<String> {
    value
        .split(CLASSPATH_DELIMITER)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Classpath directories matching the token being typed, skipping the ones already entered.
pub fn autocomplete_class_path(store: &ResourceStore, value: &str) -> Vec<String> {
    let entered = split_class_paths(value);
    let prefix = value
        .rsplit(CLASSPATH_DELIMITER)
        .next()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default();

    store
        .list_classpath_dirs()
        .into_iter()
        .filter(|directory| {
            let lower = directory.to_lowercase();
            lower.starts_with(&prefix) && !entered.contains(&lower)
        })
        .collect()
}
