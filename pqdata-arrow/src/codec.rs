use std::io::Read;

use arrow::{compute::concat_batches, datatypes::SchemaRef, record_batch::RecordBatch};
use bytes::Bytes;
use parquet::{
    arrow::{
        arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions, ParquetRecordBatchReaderBuilder},
        ArrowWriter,
    },
    basic::{Compression, ZstdLevel},
    file::{
        properties::WriterProperties,
        reader::{ChunkReader, Length},
    },
};
use pqdata_object_storage::FileHandle;

use crate::error::TableResult;

/// Adapts a [`FileHandle`] to the parquet reader.
#[derive(Debug)]
pub struct ParquetSource {
    handle: FileHandle,
    size: u64,
}

impl ParquetSource {
    pub fn new(handle: FileHandle) -> std::io::Result<Self> {
        let size = handle.size()?;
        Ok(Self { handle, size })
    }
}

impl Length for ParquetSource {
    fn len(&self) -> u64 {
        self.size
    }
}

impl ChunkReader for ParquetSource {
    type T = Box<dyn Read + Send>;

    fn get_read(&self, start: u64) -> parquet::errors::Result<Self::T> {
        Ok(self.handle.reader_at(start)?)
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        Ok(self.handle.read_range(start, length)?)
    }
}

/// Footer level information about a table.
#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub num_rows: usize,
    pub num_columns: usize,
    pub schema: SchemaRef,
}

/// Reads the footer only. No column data is decoded.
pub fn read_metadata(handle: FileHandle) -> TableResult<TableMetadata> {
    let source = ParquetSource::new(handle)?;
    let metadata = ArrowReaderMetadata::load(&source, ArrowReaderOptions::new())?;
    let schema = metadata.schema().clone();
    Ok(TableMetadata {
        num_rows: metadata.metadata().file_metadata().num_rows().max(0) as usize,
        num_columns: schema.fields().len(),
        schema,
    })
}

/// Reads the Arrow schema, including its key/value metadata.
pub fn read_schema(handle: FileHandle) -> TableResult<SchemaRef> {
    Ok(read_metadata(handle)?.schema)
}

/// Decodes the whole table into a single record batch.
pub fn read_table(handle: FileHandle) -> TableResult<RecordBatch> {
    let source = ParquetSource::new(handle)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(source)?
        .with_batch_size(pqdata_config::CONFIG.batch_size.max(1));
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Encodes a record batch, schema metadata included, as a parquet file.
pub fn write_table(batch: &RecordBatch) -> TableResult<Bytes> {
    let props = WriterProperties::builder()
        .set_compression(compression())
        .set_max_row_group_size(pqdata_config::CONFIG.max_row_group_size.max(1))
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(Bytes::from(buffer))
}

fn compression() -> Compression {
    match pqdata_config::CONFIG.compression.to_lowercase().as_str() {
        "zstd" => Compression::ZSTD(ZstdLevel::default()),
        "snappy" => Compression::SNAPPY,
        "none" | "uncompressed" => Compression::UNCOMPRESSED,
        other => {
            tracing::warn!("Unknown compression '{}', using zstd", other);
            Compression::ZSTD(ZstdLevel::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use arrow::{
        array::{Float64Array, Int32Array},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    fn make_batch() -> anyhow::Result<RecordBatch> {
        let schema = Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("a", DataType::Int32, false),
                Field::new("b", DataType::Float64, false),
            ],
            HashMap::from([("array".to_string(), "{\"shape\": [3, 2]}".to_string())]),
        ));
        Ok(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3])),
                Arc::new(Float64Array::from(vec![4.0, 5.0, 6.0])),
            ],
        )?)
    }

    #[test]
    fn reads_metadata_without_data() -> anyhow::Result<()> {
        let bytes = write_table(&make_batch()?)?;
        let metadata = read_metadata(FileHandle::Buffered(bytes))?;
        assert_eq!(metadata.num_rows, 3);
        assert_eq!(metadata.num_columns, 2);
        assert_eq!(
            metadata.schema.metadata().get("array").map(String::as_str),
            Some("{\"shape\": [3, 2]}")
        );
        Ok(())
    }

    #[test]
    fn reads_table_from_local_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("table.parquet");
        std::fs::write(&path, write_table(&make_batch()?)?)?;

        let batch = read_table(FileHandle::Local(std::fs::File::open(&path)?))?;
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 2);
        assert!(batch.schema().metadata().contains_key("array"));

        let schema = read_schema(FileHandle::Local(std::fs::File::open(&path)?))?;
        assert_eq!(schema.field(1).name(), "b");
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        let err = read_metadata(FileHandle::Buffered(Bytes::from_static(b"not parquet")));
        assert!(err.is_err());
    }
}
