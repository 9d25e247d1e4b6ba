//! `tabledata.insertAll` request and response bodies

use ledgerline_core::TransferRecord;
use serde::{Deserialize, Serialize};

/// Request body. Rows carry no `insertId`, so a retried batch may duplicate.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllRequest<'a> {
    pub skip_invalid_rows: bool,
    pub ignore_unknown_values: bool,
    pub rows: Vec<InsertRow<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InsertRow<'a> {
    pub json: &'a TransferRecord,
}

impl<'a> InsertAllRequest<'a> {
    /// All-or-nothing insert of `batch`, in order
    pub fn new(batch: &'a [TransferRecord]) -> Self {
        Self {
            skip_invalid_rows: false,
            ignore_unknown_values: false,
            rows: batch.iter().map(|json| InsertRow { json }).collect(),
        }
    }
}

/// Successful (2xx) response; row failures still arrive here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAllResponse {
    #[serde(default)]
    pub insert_errors: Vec<InsertError>,
}

#[derive(Debug, Deserialize)]
pub struct InsertError {
    /// Row position within the request
    pub index: usize,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorProto {
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub message: String,
}

/// Non-2xx body: `{"error": {"code", "message", "status"}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

/// One line describing rejected rows, first failure spelled out
pub fn rejection_summary(errors: &[InsertError], total_rows: usize) -> String {
    let Some(first) = errors.first() else {
        return format!("0 of {total_rows} rows rejected");
    };
    let detail = first
        .errors
        .iter()
        .find(|e| e.reason != "stopped")
        .or_else(|| first.errors.first())
        .map(|e| {
            if e.location.is_empty() {
                format!("{}: {}", e.reason, e.message)
            } else {
                format!("{} at {}: {}", e.reason, e.location, e.message)
            }
        })
        .unwrap_or_else(|| "no detail".to_string());
    format!(
        "{} of {total_rows} rows rejected (row {}: {detail})",
        errors.len(),
        first.index
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(i: u64) -> TransferRecord {
        TransferRecord {
            extrinsic_index: format!("{i}-1"),
            block_num: i,
            block_timestamp: 1_640_995_200,
            from: "a".into(),
            to: "b".into(),
            amount: "0.5".into(),
            success: false,
        }
    }

    #[test]
    fn request_body_shape() {
        let batch = vec![record(7), record(8)];
        let body = serde_json::to_value(InsertAllRequest::new(&batch)).unwrap();
        assert_eq!(
            body,
            json!({
                "skipInvalidRows": false,
                "ignoreUnknownValues": false,
                "rows": [
                    {"json": {
                        "extrinsic_index": "7-1", "block_num": 7,
                        "block_timestamp": 1_640_995_200, "from": "a", "to": "b",
                        "amount": "0.5", "success": false
                    }},
                    {"json": {
                        "extrinsic_index": "8-1", "block_num": 8,
                        "block_timestamp": 1_640_995_200, "from": "a", "to": "b",
                        "amount": "0.5", "success": false
                    }}
                ]
            })
        );
    }

    #[test]
    fn response_without_errors() {
        let resp: InsertAllResponse =
            serde_json::from_str(r#"{"kind":"bigquery#tableDataInsertAllResponse"}"#).unwrap();
        assert!(resp.insert_errors.is_empty());
    }

    #[test]
    fn summary_skips_stopped_rows() {
        let resp: InsertAllResponse = serde_json::from_value(json!({
            "insertErrors": [
                {"index": 0, "errors": [{"reason": "stopped", "message": ""}]},
                {"index": 1, "errors": [{"reason": "stopped"}]},
            ]
        }))
        .unwrap();
        assert_eq!(
            rejection_summary(&resp.insert_errors, 2),
            "2 of 2 rows rejected (row 0: stopped: )"
        );

        let resp: InsertAllResponse = serde_json::from_value(json!({
            "insertErrors": [{"index": 3, "errors": [
                {"reason": "stopped"},
                {"reason": "invalid", "location": "block_num", "message": "not an integer"}
            ]}]
        }))
        .unwrap();
        assert_eq!(
            rejection_summary(&resp.insert_errors, 5),
            "1 of 5 rows rejected (row 3: invalid at block_num: not an integer)"
        );
    }
}
