//! Persisted payout tables: UTF-8 with a byte-order mark, one header row,
//! amounts to two decimals.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::aggregate::Tally;
use crate::error::{Result, ToolError};
use crate::model::{Counts, PayoutRecord};

const BOM: &[u8] = b"\xEF\xBB\xBF";

const AMOUNT_HEADERS: [&str; 4] = ["reviewer", "correct_amount", "incorrect_amount", "total"];
const COUNT_HEADERS: [&str; 2] = ["correct_count", "incorrect_count"];

/// Writes one line per reviewer-assignment id, in key order.
pub fn write_detail(path: &Path, detail: &BTreeMap<String, Tally>) -> Result<()> {
    write_table(path, detail, false)
}

/// Writes one line per display name, in key order, optionally followed by
/// the classification counts.
pub fn write_summary(
    path: &Path,
    summary: &BTreeMap<String, Tally>,
    with_counts: bool,
) -> Result<()> {
    write_table(path, summary, with_counts)
}

fn write_table(path: &Path, table: &BTreeMap<String, Tally>, with_counts: bool) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(BOM)?;
    let mut writer = Writer::from_writer(file);

    let mut header: Vec<&str> = AMOUNT_HEADERS.to_vec();
    if with_counts {
        header.extend(COUNT_HEADERS);
    }
    writer.write_record(&header)?;

    for (key, tally) in table {
        let mut record = vec![
            key.clone(),
            format!("{:.2}", tally.correct),
            format!("{:.2}", tally.incorrect),
            format!("{:.2}", tally.total()),
        ];
        if with_counts {
            record.push(tally.counts.correct.to_string());
            record.push(tally.counts.incorrect.to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads a persisted detail or summary table back. Columns are taken by
/// position, so the header text is not checked. Counts are read when the
/// record carries the two extra columns.
pub fn read_records(path: &Path) -> Result<Vec<PayoutRecord>> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    let mut content = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut content)?;
    let content = content.strip_prefix(BOM).unwrap_or(&content);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(parse_record(path, line, &record)?);
    }
    Ok(records)
}

fn parse_record(path: &Path, line: u64, record: &StringRecord) -> Result<PayoutRecord> {
    let invalid = |message: String| ToolError::InvalidRecord {
        path: path.to_path_buf(),
        line,
        message,
    };
    let field = |index: usize, name: &str| {
        record
            .get(index)
            .map(str::trim)
            .ok_or_else(|| invalid(format!("missing {name} column")))
    };
    let amount = |index: usize, name: &str| -> Result<f64> {
        let raw = field(index, name)?;
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| invalid(format!("{name} '{raw}' is not a number")))
    };
    let count = |index: usize, name: &str| -> Result<u64> {
        let raw = field(index, name)?;
        raw.parse::<u64>()
            .map_err(|_| invalid(format!("{name} '{raw}' is not a count")))
    };

    let key = field(0, "reviewer")?.to_string();
    if key.is_empty() {
        return Err(invalid("empty reviewer".to_string()));
    }
    let counts = if record.len() >= 6 {
        Some(Counts {
            correct: count(4, "correct count")?,
            incorrect: count(5, "incorrect count")?,
        })
    } else {
        None
    };

    Ok(PayoutRecord {
        line,
        key,
        correct: amount(1, "correct amount")?,
        incorrect: amount(2, "incorrect amount")?,
        total: amount(3, "total")?,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tally(correct: f64, incorrect: f64, counts: (u64, u64)) -> Tally {
        Tally {
            correct,
            incorrect,
            counts: Counts {
                correct: counts.0,
                incorrect: counts.1,
            },
        }
    }

    #[test]
    fn summary_with_counts_is_written_with_bom() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("summary.csv");
        let table = BTreeMap::from([
            ("A".to_string(), tally(10.0, 5.0, (1, 1))),
            ("B".to_string(), tally(0.333, 0.0, (1, 0))),
        ]);
        write_summary(&path, &table, true).expect("write summary");

        let bytes = std::fs::read(&path).expect("read back");
        assert!(bytes.starts_with(BOM));
        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).expect("utf-8");
        assert_eq!(
            text,
            "reviewer,correct_amount,incorrect_amount,total,correct_count,incorrect_count\n\
             A,10.00,5.00,15.00,1,1\n\
             B,0.33,0.00,0.33,1,0\n"
        );

        let records = read_records(&path).expect("read records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].key, "B");
        assert_eq!(records[1].correct, 0.33);
        assert_eq!(
            records[0].counts,
            Some(Counts {
                correct: 1,
                incorrect: 1
            })
        );
    }

    #[test]
    fn localized_headers_are_read_by_position() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("detail.csv");
        let mut content = BOM.to_vec();
        content.extend_from_slice(
            "老师,回答正确所得金,回答错误所得金,所得金合计\n孙林-251,12.50,0.00,12.50\n".as_bytes(),
        );
        std::fs::write(&path, content).expect("write fixture");

        let records = read_records(&path).expect("read records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "孙林-251");
        assert_eq!(records[0].total, 12.5);
        assert_eq!(records[0].counts, None);
    }

    #[test]
    fn non_numeric_amount_is_fatal() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("detail.csv");
        std::fs::write(&path, "reviewer,c,w,t\nA-1,ten,0,10\n").expect("write fixture");

        let err = read_records(&path).expect_err("bad amount");
        match err {
            ToolError::InvalidRecord { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("'ten'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().expect("tempdir");
        let err = read_records(&dir.path().join("absent.csv")).expect_err("missing");
        assert!(matches!(err, ToolError::MissingInput(_)));
    }
}
