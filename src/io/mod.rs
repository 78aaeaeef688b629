//! Workbook and CSV readers and writers.

pub mod excel_write;
pub mod fills;
pub mod payout_csv;
pub mod workbook;
