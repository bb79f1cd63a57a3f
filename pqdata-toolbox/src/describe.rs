use pqdata_core::{open_storage, Entry};

pub fn describe(root: &str, key_path: &str) -> anyhow::Result<()> {
    let storage = open_storage(root)?;
    let Entry::Array(array) = storage.resolve(key_path)? else {
        anyhow::bail!("{} does not resolve to a table", key_path);
    };

    println!("{}", array.describe()?);
    if let Some(metadata) = array.attrs()? {
        if let Some(shape) = &metadata.shape {
            println!("Declared shape: {:?}", shape);
        }
        if let Some(class) = &metadata.class {
            println!("Declared class: {}", class);
        }
    }
    Ok(())
}
