//! Arrow schema for the transfers table

use std::sync::{Arc, LazyLock};

use arrow::array::{ArrayRef, BooleanArray, Int64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;

use crate::record::TransferRecord;

/// Transfers table schema, column names match the wire field names
pub static TRANSFERS: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("extrinsic_index", DataType::Utf8, false),
        Field::new("block_num", DataType::UInt64, false),
        Field::new("block_timestamp", DataType::Int64, false),
        Field::new("from", DataType::Utf8, false),
        Field::new("to", DataType::Utf8, false),
        // Decimal string, never parsed
        Field::new("amount", DataType::Utf8, false),
        Field::new("success", DataType::Boolean, false),
    ]))
});

pub fn transfers() -> &'static Arc<Schema> {
    &TRANSFERS
}

/// Build a columnar batch from a slice of records, preserving order
pub fn to_record_batch(records: &[TransferRecord]) -> Result<RecordBatch, ArrowError> {
    let arrays: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.extrinsic_index.as_str()),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.block_num),
        )),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.block_timestamp),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.from.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.to.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.amount.as_str()),
        )),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.success).collect::<Vec<_>>(),
        )),
    ];
    RecordBatch::try_new(transfers().clone(), arrays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn record(i: u64) -> TransferRecord {
        TransferRecord {
            extrinsic_index: format!("{i}-1"),
            block_num: i,
            block_timestamp: 1_600_000_000 + i as i64,
            from: format!("from{i}"),
            to: format!("to{i}"),
            amount: format!("{i}.5"),
            success: i % 2 == 0,
        }
    }

    #[test]
    fn schema_has_expected_fields() {
        let schema = transfers();
        assert_eq!(schema.fields().len(), 7);
        assert!(schema.field_with_name("extrinsic_index").is_ok());
        assert_eq!(
            schema.field_with_name("amount").unwrap().data_type(),
            &DataType::Utf8
        );
    }

    #[test]
    fn batch_preserves_order_and_values() {
        let records: Vec<_> = (1..=3).map(record).collect();
        let batch = to_record_batch(&records).unwrap();
        assert_eq!(batch.num_rows(), 3);

        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(0), "1-1");
        assert_eq!(ids.value(2), "3-1");

        let amounts = batch
            .column(5)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(amounts.value(1), "2.5");

        let success = batch
            .column(6)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(!success.value(0));
        assert!(success.value(1));
        assert_eq!(success.null_count(), 0);
    }

    #[test]
    fn empty_batch_is_valid() {
        let batch = to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
