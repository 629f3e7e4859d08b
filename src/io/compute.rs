use anyhow::{Context, Result};
use std::io::{Read, Write};

use crate::domain::{LedgerEntry, ParseError, compute_ledger, parse_transactions};

/// Compute ledger entries from a JSON array of raw backend transaction records.
pub fn ledger_from_json(json: &str) -> Result<Vec<LedgerEntry>, ParseError> {
    let transactions = parse_transactions(json)?;
    Ok(compute_ledger(&transactions))
}

/// Read raw transactions as JSON, write the computed ledger as JSON.
/// Returns the number of entries written.
pub fn compute_json<R: Read, W: Write>(mut reader: R, writer: W) -> Result<usize> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .context("Failed to read transaction input")?;

    let entries = ledger_from_json(&input)?;
    write_ledger_json(&entries, writer)?;
    Ok(entries.len())
}

/// Write computed ledger entries as a pretty-printed JSON array.
pub fn write_ledger_json<W: Write>(entries: &[LedgerEntry], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, entries)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_json_output_shape() {
        let input = r#"[
            {"type": 1, "date": "2024-05-01T00:00:00Z", "unit": 5, "quantity": 10},
            {"type": 2, "date": "2024-05-02T00:00:00Z", "unit": 5, "quantity": 3}
        ]"#;
        let mut output = Vec::new();

        let count = compute_json(input.as_bytes(), &mut output).unwrap();
        assert_eq!(count, 2);

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        let entries = value.as_array().unwrap();

        assert_eq!(entries[0]["id"], 2);
        assert_eq!(entries[0]["kind"], "sale");
        assert_eq!(entries[0]["date"], "2024-05-02T00:00:00Z");
        assert_eq!(entries[0]["unit_price"], 5);
        assert_eq!(entries[0]["quantity"], 3);
        assert_eq!(entries[0]["line_value"], 15);
        assert_eq!(entries[0]["balance"], 7);

        assert_eq!(entries[1]["id"], 1);
        assert_eq!(entries[1]["kind"], "purchase");
        assert_eq!(entries[1]["balance"], 10);
        assert_eq!(entries[1]["line_value"], 50);
    }

    #[test]
    fn test_compute_json_empty_input() {
        let mut output = Vec::new();
        assert_eq!(compute_json("[]".as_bytes(), &mut output).unwrap(), 0);
        assert_eq!(String::from_utf8(output).unwrap().trim(), "[]");
    }

    #[test]
    fn test_compute_json_rejects_unknown_kind() {
        let input = r#"[{"type": "refund", "date": "2024-05-01", "unit": 5, "quantity": 1}]"#;
        let mut output = Vec::new();

        let err = compute_json(input.as_bytes(), &mut output).unwrap_err();
        assert!(err.to_string().contains("record 0"));
        assert!(output.is_empty());
    }
}
