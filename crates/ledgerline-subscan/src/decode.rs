//! Typed decoding of `/api/scan/transfers` responses

use ledgerline_core::{FetchError, TransferRecord};
use serde::Deserialize;

/// Response envelope: `{code, message, data: {count, transfers}}`
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    message: Option<String>,
    data: Option<TransfersData>,
}

#[derive(Deserialize)]
struct TransfersData {
    count: Option<u64>,
    transfers: Option<Vec<TransferRecord>>,
}

/// One decoded page; empty `transfers` means end-of-stream
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TransfersPage {
    /// Total matches, present when the query set `include_total`
    pub count: Option<u64>,
    pub transfers: Vec<TransferRecord>,
}

impl TransfersPage {
    pub fn is_end_of_stream(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Decode a response body.
///
/// Missing or null `data` / `data.transfers` is end-of-stream, not an error.
/// Invalid JSON, a wrongly-typed field, or a record missing a required
/// attribute is [`FetchError::Decode`].
pub fn decode_page(body: &[u8]) -> Result<TransfersPage, FetchError> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if envelope.code != 0 {
        return Err(FetchError::Api {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        });
    }

    let Some(data) = envelope.data else {
        return Ok(TransfersPage::default());
    };
    let transfers = data.transfers.unwrap_or_default();

    if let Some(pos) = transfers.iter().position(|t| t.extrinsic_index.is_empty()) {
        return Err(FetchError::Decode(format!(
            "transfer {pos}: empty extrinsic_index"
        )));
    }

    Ok(TransfersPage {
        count: data.count,
        transfers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER: &str = r#"{
        "from": "4jbtsgNhpGAzdEGrKRb7g8Mq",
        "to": "4kFQf1vN7U8pS5iCjkTPvB2y",
        "extrinsic_index": "1040266-2",
        "success": true,
        "hash": "0x5e4f",
        "block_num": 1040266,
        "block_timestamp": 1640995200,
        "module": "balances",
        "amount": "1.000000000000000001",
        "amount_v2": "1000000000000000001",
        "fee": "1250000000",
        "asset_symbol": "NODL"
    }"#;

    fn body(data: &str) -> Vec<u8> {
        format!(r#"{{"code":0,"message":"Success","generated_at":1640995300,"data":{data}}}"#)
            .into_bytes()
    }

    #[test]
    fn decodes_transfers_ignoring_extra_fields() {
        let page = decode_page(&body(&format!(
            r#"{{"count":2,"transfers":[{TRANSFER},{TRANSFER}]}}"#
        )))
        .unwrap();
        assert_eq!(page.count, Some(2));
        assert_eq!(page.transfers.len(), 2);

        let t = &page.transfers[0];
        assert_eq!(t.extrinsic_index, "1040266-2");
        assert_eq!(t.block_num, 1_040_266);
        assert_eq!(t.block_timestamp, 1_640_995_200);
        assert_eq!(t.from, "4jbtsgNhpGAzdEGrKRb7g8Mq");
        assert_eq!(t.to, "4kFQf1vN7U8pS5iCjkTPvB2y");
        assert_eq!(t.amount, "1.000000000000000001");
        assert!(t.success);
    }

    #[test]
    fn missing_transfers_is_end_of_stream() {
        let page = decode_page(&body(r#"{"count":2}"#)).unwrap();
        assert!(page.is_end_of_stream());
        assert_eq!(page.count, Some(2));
    }

    #[test]
    fn null_transfers_is_end_of_stream() {
        let page = decode_page(&body(r#"{"count":0,"transfers":null}"#)).unwrap();
        assert!(page.is_end_of_stream());
    }

    #[test]
    fn missing_or_null_data_is_end_of_stream() {
        assert!(decode_page(br#"{"code":0,"message":"Success"}"#)
            .unwrap()
            .is_end_of_stream());
        assert!(decode_page(&body("null")).unwrap().is_end_of_stream());
    }

    #[test]
    fn empty_array_is_end_of_stream() {
        assert!(decode_page(&body(r#"{"transfers":[]}"#))
            .unwrap()
            .is_end_of_stream());
    }

    #[test]
    fn malformed_json_is_decode_error() {
        for bad in [&b"<html>502 Bad Gateway</html>"[..], b"", b"{\"code\":0,"] {
            assert!(matches!(decode_page(bad), Err(FetchError::Decode(_))));
        }
    }

    #[test]
    fn wrongly_shaped_fields_are_decode_errors() {
        let cases = [
            r#""not an object""#,
            r#"{"transfers":"nope"}"#,
            r#"{"transfers":[{"extrinsic_index":"1-1"}]}"#,
            r#"{"transfers":[1,2,3]}"#,
        ];
        for data in cases {
            assert!(
                matches!(decode_page(&body(data)), Err(FetchError::Decode(_))),
                "{data}"
            );
        }
    }

    #[test]
    fn numeric_amount_is_decode_error() {
        let numeric = TRANSFER.replace(r#""1.000000000000000001""#, "1.5");
        let result = decode_page(&body(&format!(r#"{{"transfers":[{numeric}]}}"#)));
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }

    #[test]
    fn empty_extrinsic_index_is_decode_error() {
        let empty = TRANSFER.replace("1040266-2", "");
        let result = decode_page(&body(&format!(
            r#"{{"transfers":[{TRANSFER},{empty}]}}"#
        )));
        match result {
            Err(FetchError::Decode(msg)) => assert!(msg.contains("transfer 1")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn nonzero_code_is_api_error() {
        let result = decode_page(br#"{"code":10004,"message":"Invalid API Key","data":null}"#);
        match result {
            Err(FetchError::Api { code, message }) => {
                assert_eq!(code, 10004);
                assert_eq!(message, "Invalid API Key");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }
}
