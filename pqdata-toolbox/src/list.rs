use pqdata_core::{open_storage, Entry};

pub fn list_keys(root: &str, key_path: Option<&str>) -> anyhow::Result<()> {
    let storage = open_storage(root)?;
    let group = match key_path {
        None => storage,
        Some(path) => match storage.resolve(path)? {
            Entry::Group(group) => group,
            Entry::Array(array) => anyhow::bail!("{} is a table, not a group", array.name()),
            Entry::Value(value) => {
                println!("{}", serde_json::to_string_pretty(&value)?);
                return Ok(());
            }
        },
    };

    println!("{} ({} entries)", group.name(), group.len()?);
    let mut keys: Vec<String> = group.keys()?.collect();
    keys.sort();
    for key in keys {
        let marker = match group.get(&key) {
            Ok(Entry::Group(_)) => "group".to_string(),
            Ok(Entry::Array(array)) => {
                let (rows, cols) = array.shape();
                format!("array {}x{}", rows, cols)
            }
            Ok(Entry::Value(_)) => "value".to_string(),
            Err(err) => {
                tracing::warn!("Unable to resolve '{}': {}", key, err);
                "unresolved".to_string()
            }
        };
        println!("  {:<24} {}", key, marker);
    }
    Ok(())
}
