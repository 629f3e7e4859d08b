use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MovementKind, ParseError, Quantity, ValidationError};

/// Price of a single unit, in the currency's smallest unit.
pub type UnitPrice = i64;

/// Largest quantity a single movement may carry.
pub const MAX_QUANTITY: Quantity = 1_000_000_000;

/// Largest unit price a product or movement may carry.
/// Together with MAX_QUANTITY this keeps every line value inside i64.
pub const MAX_UNIT_PRICE: UnitPrice = 1_000_000_000;

/// A raw inventory transaction as delivered by the inventory backend:
/// one purchase or sale of a product, in chronological position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    kind: MovementKind,
    date: DateTime<Utc>,
    unit_price: UnitPrice,
    quantity: Quantity,
}

impl Transaction {
    pub fn new(
        kind: MovementKind,
        date: DateTime<Utc>,
        unit_price: UnitPrice,
        quantity: Quantity,
    ) -> Result<Self, ValidationError> {
        validate_unit_price(unit_price)?;
        validate_quantity(quantity)?;
        Ok(Self {
            kind,
            date,
            unit_price,
            quantity,
        })
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn unit_price(&self) -> UnitPrice {
        self.unit_price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Quantity signed by movement direction (+ inbound, - outbound).
    pub fn signed_quantity(&self) -> Quantity {
        self.kind.signed(self.quantity)
    }

    pub fn line_value(&self) -> i64 {
        self.unit_price * self.quantity
    }
}

pub fn validate_quantity(quantity: Quantity) -> Result<(), ValidationError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            value: quantity,
            min: 1,
            max: MAX_QUANTITY,
        });
    }
    Ok(())
}

pub fn validate_unit_price(unit_price: UnitPrice) -> Result<(), ValidationError> {
    if !(0..=MAX_UNIT_PRICE).contains(&unit_price) {
        return Err(ValidationError::OutOfRange {
            field: "unit_price".to_string(),
            value: unit_price,
            min: 0,
            max: MAX_UNIT_PRICE,
        });
    }
    Ok(())
}

/// Parse a movement date.
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) or a bare `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidDate(input.to_string()))
}

/// Wire shape of a transaction record. The backend sends `type` and `unit`;
/// `kind` and `unit_price` are accepted as well. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct TransactionRecord {
    #[serde(rename = "type", alias = "kind")]
    kind: KindMarker,
    date: String,
    #[serde(rename = "unit", alias = "unit_price")]
    unit_price: i64,
    quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KindMarker {
    Code(i64),
    Name(String),
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = ValidationError;

    fn try_from(record: TransactionRecord) -> Result<Self, Self::Error> {
        let kind = match record.kind {
            KindMarker::Code(code) => MovementKind::from_code(code)?,
            KindMarker::Name(name) => name.parse()?,
        };
        let date = parse_date(&record.date)?;
        Transaction::new(kind, date, record.unit_price, record.quantity)
    }
}

/// Parse a JSON array of raw transaction records, preserving order.
/// The first bad record rejects the whole input.
pub fn parse_transactions(json: &str) -> Result<Vec<Transaction>, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(items) = value else {
        return Err(ParseError::NotAnArray);
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let record: TransactionRecord =
                serde_json::from_value(item).map_err(|e| ParseError::MalformedRecord {
                    index,
                    reason: e.to_string(),
                })?;
            Transaction::try_from(record)
                .map_err(|source| ParseError::InvalidRecord { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_transaction_validates_ranges() {
        let date = parse_date("2024-05-01").unwrap();
        assert!(Transaction::new(MovementKind::Inbound, date, 5, 10).is_ok());
        assert!(Transaction::new(MovementKind::Inbound, date, 0, 1).is_ok());
        assert!(matches!(
            Transaction::new(MovementKind::Inbound, date, 5, 0),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(Transaction::new(MovementKind::Outbound, date, 5, -3).is_err());
        assert!(Transaction::new(MovementKind::Inbound, date, -1, 1).is_err());
        assert!(Transaction::new(MovementKind::Inbound, date, 5, MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_line_value_at_bounds_does_not_overflow() {
        let date = parse_date("2024-05-01").unwrap();
        let tx = Transaction::new(MovementKind::Inbound, date, MAX_UNIT_PRICE, MAX_QUANTITY)
            .unwrap();
        assert_eq!(tx.line_value(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_parse_date_formats() {
        let midnight = parse_date("2024-05-04").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-05-04T00:00:00+00:00");

        let offset = parse_date("2024-05-04T10:22:00+09:00").unwrap();
        assert_eq!(offset.to_rfc3339(), "2024-05-04T01:22:00+00:00");

        let naive = parse_date("2024-05-04T01:22:00.250").unwrap();
        assert_eq!(naive.timestamp_subsec_millis(), 250);

        assert!(matches!(
            parse_date("04/05/2024"),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_backend_records() {
        let json = r#"[
            {"id": 4, "type": 1, "date": "2024-05-01T09:00:00Z", "unit": 5, "quantity": 10},
            {"id": 9, "type": "2", "date": "2024-05-02", "unit": 5, "quantity": 3}
        ]"#;

        let txs = parse_transactions(json).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind(), MovementKind::Inbound);
        assert_eq!(txs[0].quantity(), 10);
        assert_eq!(txs[1].kind(), MovementKind::Outbound);
        assert_eq!(txs[1].signed_quantity(), -3);
    }

    #[test]
    fn test_parse_accepts_descriptive_field_names() {
        let json =
            r#"[{"kind": "purchase", "date": "2024-05-01", "unit_price": 7, "quantity": 2}]"#;
        let txs = parse_transactions(json).unwrap();
        assert_eq!(txs[0].unit_price(), 7);
        assert_eq!(txs[0].line_value(), 14);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_transactions("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_transactions(r#"{"type": 1}"#),
            Err(ParseError::NotAnArray)
        ));
        assert!(matches!(parse_transactions("not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_kind_with_index() {
        let json = r#"[
            {"type": 1, "date": "2024-05-01", "unit": 5, "quantity": 10},
            {"type": 3, "date": "2024-05-02", "unit": 5, "quantity": 3}
        ]"#;

        match parse_transactions(json) {
            Err(ParseError::InvalidRecord { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source, ValidationError::UnknownMovementKind("3".into()));
            }
            other => panic!("expected invalid record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_missing_or_fractional_numbers() {
        let missing = r#"[{"type": 1, "date": "2024-05-01", "unit": 5}]"#;
        assert!(matches!(
            parse_transactions(missing),
            Err(ParseError::MalformedRecord { index: 0, .. })
        ));

        let fractional = r#"[{"type": 1, "date": "2024-05-01", "unit": 5, "quantity": 2.5}]"#;
        assert!(matches!(
            parse_transactions(fractional),
            Err(ParseError::MalformedRecord { index: 0, .. })
        ));

        let textual = r#"[{"type": 1, "date": "2024-05-01", "unit": "5", "quantity": 2}]"#;
        assert!(parse_transactions(textual).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let json = r#"[{"type": 1, "date": "yesterday", "unit": 5, "quantity": 2}]"#;
        assert!(matches!(
            parse_transactions(json),
            Err(ParseError::InvalidRecord {
                index: 0,
                source: ValidationError::InvalidDate(_)
            })
        ));
    }
}
