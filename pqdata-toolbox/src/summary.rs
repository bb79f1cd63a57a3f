use pqdata_core::{read_anndata, AnnData, Uns, UnsValue};

pub fn summarize(root: &str) -> anyhow::Result<()> {
    let data = read_anndata(root)?;
    print_object(&data, 0);
    Ok(())
}

fn print_object(data: &AnnData, depth: usize) {
    let indent = "  ".repeat(depth);
    let (n_obs, n_vars) = data.shape();
    println!("{}n_obs x n_vars = {} x {}", indent, n_obs, n_vars);

    if let Some(x) = &data.x {
        println!("{}  X: {} {:?}", indent, x.kind_name(), x.shape());
    }
    if let Some(obs) = &data.obs {
        println!("{}  obs: {}", indent, obs.column_names().join(", "));
    }
    if let Some(var) = &data.var {
        println!("{}  var: {}", indent, var.column_names().join(", "));
    }
    for (collection, entries) in &data.collections {
        let names: Vec<&str> = entries.keys().map(String::as_str).collect();
        println!("{}  {}: {}", indent, collection, names.join(", "));
    }
    if !data.uns.is_empty() {
        println!("{}  uns: {}", indent, uns_keys(&data.uns).join(", "));
    }
    for warning in &data.warnings {
        println!("{}  warning: {}", indent, warning);
    }
    if let Some(raw) = &data.raw {
        println!("{}  raw:", indent);
        print_object(raw, depth + 2);
    }
    if let Some(modalities) = &data.modalities {
        if let Some(axis) = &data.axis {
            println!("{}  axis: {}", indent, axis);
        }
        for (name, modality) in modalities {
            println!("{}  mod/{}:", indent, name);
            print_object(modality, depth + 2);
        }
    }
}

/// Flattened `uns` keys, nested levels joined with `/`.
fn uns_keys(uns: &Uns) -> Vec<String> {
    uns.iter()
        .flat_map(|(key, value)| match value {
            UnsValue::Mapping(nested) if !nested.is_empty() => uns_keys(nested)
                .into_iter()
                .map(|nested_key| format!("{}/{}", key, nested_key))
                .collect(),
            UnsValue::Element(element) => vec![format!("{} ({})", key, element.kind_name())],
            _ => vec![key.clone()],
        })
        .collect()
}
