use std::collections::BTreeMap;
use std::path::Path;

use rust_xlsxwriter::{Format, Table, Workbook, Worksheet};

use crate::aggregate::{Aggregates, Tally};
use crate::config::OutputOptions;
use crate::error::Result;

pub const DETAIL_SHEET: &str = "Detail";
pub const SUMMARY_SHEET: &str = "Summary";

const AMOUNT_FORMAT: &str = "0.00";

/// Writes the payout tables to a workbook, one worksheet per enabled table.
pub fn write_payout_workbook(
    path: &Path,
    aggregates: &Aggregates,
    options: &OutputOptions,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let amount = Format::new().set_num_format(AMOUNT_FORMAT);

    if options.detail {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(DETAIL_SHEET)?;
        write_table(worksheet, aggregates.detail(), false, &amount)?;
    }
    if options.summary {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SUMMARY_SHEET)?;
        write_table(worksheet, aggregates.summary(), options.counts, &amount)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    rows: &BTreeMap<String, Tally>,
    with_counts: bool,
    amount: &Format,
) -> Result<()> {
    let mut columns = vec!["reviewer", "correct_amount", "incorrect_amount", "total"];
    if with_counts {
        columns.extend(["correct_count", "incorrect_count"]);
    }
    for (col_idx, header) in columns.iter().enumerate() {
        worksheet.write_string(0, col_idx as u16, *header)?;
    }

    for (row_idx, (key, tally)) in rows.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        worksheet.write_string(row, 0, key)?;
        worksheet.write_number_with_format(row, 1, tally.correct, amount)?;
        worksheet.write_number_with_format(row, 2, tally.incorrect, amount)?;
        worksheet.write_number_with_format(row, 3, tally.total(), amount)?;
        if with_counts {
            worksheet.write_number(row, 4, tally.counts.correct as f64)?;
            worksheet.write_number(row, 5, tally.counts.incorrect as f64)?;
        }
    }

    worksheet.set_column_width(0, 24)?;
    worksheet.set_freeze_panes(1, 0)?;
    // A table needs at least one data row below its header.
    if !rows.is_empty() {
        let mut table = Table::new();
        table.set_autofilter(true);
        let col_end = (columns.len() as u16).saturating_sub(1);
        worksheet.add_table(0, 0, rows.len() as u32, col_end, &table)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityParser;
    use crate::model::{Classification, Contribution};
    use calamine::{DataType, Reader, Xlsx, open_workbook};
    use tempfile::tempdir;

    #[test]
    fn payout_workbook_has_both_sheets() {
        let contributions = vec![
            Contribution {
                id: "A-1".into(),
                classification: Classification::Correct,
                amount: 10.0,
            },
            Contribution {
                id: "A-2".into(),
                classification: Classification::Incorrect,
                amount: 5.0,
            },
        ];
        let aggregates = Aggregates::from_contributions(contributions, &IdentityParser::default());
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("payout.xlsx");
        write_payout_workbook(&path, &aggregates, &OutputOptions::default())
            .expect("write workbook");

        let mut workbook: Xlsx<_> = open_workbook(&path).expect("open workbook");
        assert_eq!(workbook.sheet_names(), vec![DETAIL_SHEET, SUMMARY_SHEET]);

        let detail = workbook
            .worksheet_range(DETAIL_SHEET)
            .expect("detail sheet")
            .expect("detail range");
        assert_eq!(detail.get_value((1, 0)), Some(&DataType::String("A-1".into())));
        assert_eq!(detail.get_value((2, 3)), Some(&DataType::Float(5.0)));

        let summary = workbook
            .worksheet_range(SUMMARY_SHEET)
            .expect("summary sheet")
            .expect("summary range");
        assert_eq!(summary.get_value((1, 0)), Some(&DataType::String("A".into())));
        assert_eq!(summary.get_value((1, 3)), Some(&DataType::Float(15.0)));
        assert_eq!(summary.get_value((1, 5)), Some(&DataType::Float(1.0)));
    }
}
