//! Transfer records and page request parameters

use serde::{Deserialize, Serialize};

/// One ledger transfer as returned by the indexer and written to the warehouse.
///
/// Field names double as wire names and warehouse column names.
/// `amount` stays a decimal string end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub extrinsic_index: String,
    pub block_num: u64,
    pub block_timestamp: i64,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub success: bool,
}

/// Optional query filters, forwarded verbatim on every page request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrinsic_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_total: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_symbol: Option<String>,
}

/// Parameters of a single page request (`row` per page, zero-based `page`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub row: u32,
    pub page: u32,
    #[serde(flatten)]
    pub filter: TransferFilter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_omits_unset_filters() {
        let req = PageRequest {
            row: 10,
            page: 3,
            filter: TransferFilter::default(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"row": 10, "page": 3}));
    }

    #[test]
    fn page_request_flattens_filters() {
        let req = PageRequest {
            row: 25,
            page: 0,
            filter: TransferFilter {
                address: Some("4jbtsgNhpGAzdEGrKRb7g8Mq".to_string()),
                from_block: Some(304_864),
                to_block: Some(1_040_266),
                include_total: Some(true),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["address"], "4jbtsgNhpGAzdEGrKRb7g8Mq");
        assert_eq!(json["from_block"], 304_864);
        assert_eq!(json["to_block"], 1_040_266);
        assert_eq!(json["include_total"], true);
        assert!(json.get("direction").is_none());
        assert!(json.get("asset_symbol").is_none());
    }

    #[test]
    fn amount_survives_as_string() {
        let record = TransferRecord {
            extrinsic_index: "1040266-2".to_string(),
            block_num: 1_040_266,
            block_timestamp: 1_640_000_000,
            from: "a".to_string(),
            to: "b".to_string(),
            amount: "0.000000000000000001".to_string(),
            success: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["amount"], "0.000000000000000001");
        assert_eq!(json["from"], "a");
    }
}
