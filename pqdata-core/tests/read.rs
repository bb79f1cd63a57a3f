mod common;

use pqdata_arrow::{DecodeWarning, Element, SparseMatrix, TableKind};
use pqdata_core::{
    read::{read_anndata, ReadOptions},
    read_mudata, read_table, AxisCollection, PqDataError, UnsValue,
};
use pqdata_object_storage::LocalFileSystem;
use serde_json::json;

use common::*;

#[test]
fn reads_matrix_with_annotations() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join("pbmc.pqdata");
    write_dense(&root.join("X.parquet"), 50, 20);
    write_frame(&root.join("obs.parquet"), "cell", 50);
    write_frame(&root.join("var.parquet"), "gene", 20);

    let data = pqdata_core::read_anndata(&root)?;
    assert_eq!(data.x.as_ref().map(Element::shape), Some(vec![50, 20]));
    assert_eq!(data.obs.as_ref().map(|obs| obs.num_rows()), Some(50));
    assert_eq!(data.var.as_ref().map(|var| var.num_rows()), Some(20));
    assert_eq!(data.shape(), (50, 20));
    assert!(data.warnings.is_empty());

    assert!(data.raw.is_none());
    assert!(data.modalities.is_none());
    assert!(data.uns.is_empty());
    assert!(data.collections.is_empty());
    Ok(())
}

#[test]
fn empty_directory_reads_as_empty_object() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let data = pqdata_core::read_anndata(dir.path())?;
    assert!(data.x.is_none());
    assert!(data.obs.is_none());
    assert_eq!(data.shape(), (0, 0));

    assert!(matches!(
        pqdata_core::read_anndata(dir.path().join("missing")),
        Err(PqDataError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn sparse_matrices_keep_entries_and_class() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let batch = coordinates(vec![0, 4, 2], vec![1, 0, 3], vec![1.0, 2.0, 3.0]);
    write_batch(
        &root.join("X.parquet"),
        &with_metadata(
            batch.clone(),
            &[(
                "array",
                r#"{"shape": [5, 4], "class": {"module": "scipy.sparse", "name": "csr_matrix"}}"#,
            )],
        ),
    );
    write_batch(
        &root.join("obsp").join("distances.parquet"),
        &with_metadata(batch, &[("array", r#"{"shape": [5, 5]}"#)]),
    );

    let data = pqdata_core::read_anndata(root)?;
    let Some(Element::Sparse(SparseMatrix::Csr(x))) = &data.x else {
        panic!("expected a CSR matrix, got {:?}", data.x);
    };
    assert_eq!(x.shape(), (5, 4));
    assert_eq!(x.get(0, 1), 1.0);
    assert_eq!(x.get(4, 0), 2.0);
    assert_eq!(x.get(2, 3), 3.0);
    assert_eq!(x.nnz(), 3);

    let distances = &data.collection(AxisCollection::Obsp).unwrap()["distances"];
    assert!(matches!(distances, Element::Sparse(SparseMatrix::Coo(_))));
    assert_eq!(distances.shape(), vec![5, 5]);
    Ok(())
}

#[test]
fn shape_mismatch_still_returns_data() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("X.parquet");
    let batch = pqdata_arrow::encode::encode_dense(&matrix(4, 3).into_dyn())?;
    write_batch(&path, &with_metadata(batch, &[("array", r#"{"shape": [3, 4]}"#)]));

    let decoded = read_table(&path, None)?;
    assert_eq!(decoded.element.shape(), vec![4, 3]);
    assert!(matches!(
        decoded.warnings.as_slice(),
        [DecodeWarning::ShapeMismatch { .. }]
    ));

    let data = pqdata_core::read_anndata(dir.path())?;
    assert_eq!(data.warnings.len(), 1);
    Ok(())
}

#[test]
fn explicit_table_kinds() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("labels.pq");
    write_batch(&path, &with_metadata(labels(&["a", "b"]), &[("origin", "tool")]));

    assert!(matches!(read_table(&path, None)?.element, Element::Table(_)));
    assert!(matches!(
        read_table(&path, Some(TableKind::DataFrame))?.element,
        Element::DataFrame(_)
    ));
    assert!(read_table(&path, Some(TableKind::Array)).is_err());
    assert!(matches!(
        read_table(dir.path().join("labels.csv"), None),
        Err(PqDataError::UnsupportedFormat(_))
    ));
    Ok(())
}

#[test]
fn uns_merges_json_and_nested_tables() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    std::fs::write(
        root.join("uns.json"),
        r#"{"title": "pbmc", "neighbors": {"params": {"k": 15}}}"#,
    )?;
    write_dense(&root.join("uns").join("neighbors").join("connectivities.parquet"), 3, 3);
    write_batch(&root.join("uns").join("leiden").join("colors.parquet"), &labels(&["red"]));

    let data = pqdata_core::read_anndata(root)?;
    assert_eq!(data.uns["title"].as_value(), Some(&json!("pbmc")));

    let neighbors = data.uns["neighbors"].as_mapping().unwrap();
    assert_eq!(
        neighbors["params"].as_mapping().unwrap()["k"].as_value(),
        Some(&json!(15))
    );
    assert!(matches!(
        neighbors["connectivities"],
        UnsValue::Element(Element::Dense(_))
    ));

    let leiden = data.uns["leiden"].as_mapping().unwrap();
    assert!(matches!(
        leiden["colors"].as_element(),
        Some(Element::DataFrame(_))
    ));
    Ok(())
}

#[test]
fn raw_is_read_recursively() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_dense(&root.join("X.parquet"), 10, 5);
    write_dense(&root.join("raw").join("X.parquet"), 10, 8);
    write_frame(&root.join("raw").join("var.parquet"), "gene", 8);
    write_dense(&root.join("raw").join("varm").join("PCs.parquet"), 8, 2);

    let data = pqdata_core::read_anndata(root)?;
    let raw = data.raw.as_deref().unwrap();
    assert_eq!(raw.shape(), (10, 8));
    assert_eq!(
        raw.collection(AxisCollection::Varm).unwrap()["PCs"].shape(),
        vec![8, 2]
    );
    assert!(data.collection(AxisCollection::Varm).is_none());
    Ok(())
}

#[test]
fn modalities_follow_manifest_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_dense(&root.join("mod").join("a").join("X.parquet"), 4, 2);
    write_dense(&root.join("mod").join("b").join("X.parquet"), 4, 3);
    std::fs::write(
        root.join("pqdata.json"),
        r#"{"mod": {"order": ["b", "a"], "axis": 0}}"#,
    )?;

    for parallel in [true, false] {
        let options = ReadOptions {
            max_depth: 8,
            parallel,
        };
        let data = read_anndata(&LocalFileSystem, root, options)?;
        assert_eq!(data.modality_names(), vec!["b", "a"]);
        assert_eq!(data.axis, Some(json!(0)));
        assert_eq!(data.shape(), (4, 5));
    }
    Ok(())
}

#[test]
fn partial_order_keeps_listing_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    for name in ["a", "b", "c"] {
        write_dense(&root.join("mod").join(name).join("X.parquet"), 2, 2);
    }
    std::fs::write(root.join("pqdata.json"), r#"{"mod": {"order": ["c", "a"]}}"#)?;

    let data = read_mudata(root)?;
    assert_eq!(data.modality_names(), vec!["a", "b", "c"]);
    assert_eq!(data.axis, None);
    Ok(())
}

#[test]
fn malformed_manifest_is_fatal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("pqdata.json"), "{\"mod\": ")?;
    assert!(matches!(
        pqdata_core::read_anndata(dir.path()),
        Err(PqDataError::MalformedMetadata { .. })
    ));
    Ok(())
}

#[test]
fn nesting_depth_is_bounded() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("raw").join("raw").join("raw");
    write_dense(&nested.join("X.parquet"), 1, 1);

    let shallow = ReadOptions {
        max_depth: 2,
        parallel: false,
    };
    assert!(matches!(
        read_anndata(&LocalFileSystem, dir.path(), shallow),
        Err(PqDataError::NestingTooDeep { .. })
    ));

    let deep = ReadOptions {
        max_depth: 3,
        parallel: false,
    };
    let data = read_anndata(&LocalFileSystem, dir.path(), deep)?;
    let innermost = data
        .raw
        .as_deref()
        .and_then(|raw| raw.raw.as_deref())
        .and_then(|raw| raw.raw.as_deref())
        .unwrap();
    assert_eq!(innermost.shape(), (1, 1));
    Ok(())
}
