use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::fills::{SheetFills, read_sheet_fills};
use crate::model::{ListCell, ListSide, RateCell, SourceRow, layout};

/// The judge sheet after loading: its name and every data row below the
/// header, in worksheet order.
#[derive(Debug, Clone)]
pub struct SourceSheet {
    pub name: String,
    pub rows: Vec<SourceRow>,
}

/// Reads the judge sheet from an xlsx workbook. Without an explicit `sheet`
/// the first sheet of the workbook is used.
pub fn read_source(path: &Path, sheet: Option<&str>) -> Result<SourceSheet> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;

    let name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ToolError::InvalidWorkbook("workbook has no sheets".into()))?,
    };
    let range = read_required_sheet(&mut workbook, &name)?;

    let columns: Vec<u32> = ListSide::ALL.iter().map(|side| side.column()).collect();
    let fills = read_sheet_fills(path, &name, &columns)?;

    let rows = collect_rows(&range, &fills);
    debug!(sheet = %name, rows = rows.len(), "loaded judge sheet");
    Ok(SourceSheet { name, rows })
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| ToolError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(ToolError::from)?;
    Ok(range)
}

fn collect_rows(range: &Range<DataType>, fills: &SheetFills) -> Vec<SourceRow> {
    let Some((last_row, _)) = range.end() else {
        return Vec::new();
    };
    // `get_value` takes absolute 0-based positions.
    let cell = |row: u32, column: u32| range.get_value((row - 1, column - 1));

    (layout::FIRST_DATA_ROW..=last_row + 1)
        .map(|row| {
            let list = |side: ListSide| {
                let text = cell_to_string(cell(row, side.column()));
                ListCell {
                    text: (!text.is_empty()).then_some(text),
                    fill: fills.fill_at(row, side.column()),
                }
            };
            SourceRow {
                row,
                problem_id: cell_to_string(cell(row, layout::PROBLEM_COLUMN)),
                passed: list(ListSide::Passed),
                failed: list(ListSide::Failed),
                correct_rate: rate_cell(cell(row, layout::CORRECT_RATE_COLUMN)),
                incorrect_rate: rate_cell(cell(row, layout::INCORRECT_RATE_COLUMN)),
            }
        })
        .collect()
}

fn rate_cell(cell: Option<&DataType>) -> RateCell {
    match cell {
        Some(DataType::Float(value)) => RateCell::Number(*value),
        Some(DataType::Int(value)) => RateCell::Number(*value as f64),
        Some(DataType::Bool(value)) => RateCell::Bool(*value),
        Some(DataType::String(value)) => RateCell::Text(value.clone()),
        Some(DataType::Empty) | None => RateCell::Empty,
        Some(other) => RateCell::Unreadable(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_cells_keep_their_raw_kind() {
        assert_eq!(rate_cell(Some(&DataType::Float(2.5))), RateCell::Number(2.5));
        assert_eq!(rate_cell(Some(&DataType::Int(3))), RateCell::Number(3.0));
        assert_eq!(rate_cell(Some(&DataType::Bool(true))), RateCell::Bool(true));
        assert_eq!(
            rate_cell(Some(&DataType::String(" 4 ".into()))),
            RateCell::Text(" 4 ".into())
        );
        assert_eq!(rate_cell(None), RateCell::Empty);
        assert!(matches!(
            rate_cell(Some(&DataType::Error(calamine::CellErrorType::Div0))),
            RateCell::Unreadable(_)
        ));
    }

    #[test]
    fn rows_follow_the_fixed_layout() {
        let mut range = Range::new((0, 0), (2, 13));
        range.set_value((0, 0), DataType::String("problem_id".into()));
        range.set_value((1, 0), DataType::String("P-1".into()));
        range.set_value((1, 2), DataType::String("A-1 B-2".into()));
        range.set_value((1, 10), DataType::Float(10.0));
        range.set_value((1, 13), DataType::String("5".into()));
        range.set_value((2, 0), DataType::Int(7));

        let rows = collect_rows(&range, &SheetFills::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].problem_id, "P-1");
        assert_eq!(rows[0].passed.text.as_deref(), Some("A-1 B-2"));
        assert_eq!(rows[0].failed.text, None);
        assert_eq!(rows[0].correct_rate, RateCell::Number(10.0));
        assert_eq!(rows[0].incorrect_rate, RateCell::Text("5".into()));
        assert_eq!(rows[1].row, 3);
        assert_eq!(rows[1].problem_id, "7");
        assert_eq!(rows[1].correct_rate, RateCell::Empty);
    }
}
