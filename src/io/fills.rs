//! Cell fill lookup straight from the xlsx package.
//!
//! The cell reader only sees values, so fills are resolved separately:
//! `xl/styles.xml` gives `<fills>` and the `<cellXfs>` table mapping a style
//! index to a fill, and the worksheet part gives each cell's `s` attribute.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Result, ToolError};
use crate::model::{CellFill, FillColor};

const STYLES_PART: &str = "xl/styles.xml";
const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// Resolved fill for every `cellXfs` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleFills {
    by_style: Vec<CellFill>,
}

impl StyleFills {
    pub fn get(&self, style: usize) -> CellFill {
        self.by_style.get(style).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_style.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_style.is_empty()
    }
}

/// Fills of the cells of one worksheet, addressed by 1-based row and column.
#[derive(Debug, Clone, Default)]
pub struct SheetFills {
    styles: StyleFills,
    cell_styles: HashMap<(u32, u32), usize>,
}

impl SheetFills {
    pub fn fill_at(&self, row: u32, column: u32) -> CellFill {
        let style = self.cell_styles.get(&(row, column)).copied().unwrap_or(0);
        self.styles.get(style)
    }
}

/// Reads the fills of `columns` on worksheet `sheet_name` of the workbook at
/// `path`. A workbook without a styles part has no fills at all.
pub fn read_sheet_fills(path: &Path, sheet_name: &str, columns: &[u32]) -> Result<SheetFills> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let Some(styles_xml) = read_part(&mut archive, STYLES_PART)? else {
        warn!(path = %path.display(), "workbook has no styles part; every cell is unfilled");
        return Ok(SheetFills::default());
    };
    let styles = parse_styles_xml(&styles_xml)?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?.unwrap_or_default();
    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?.unwrap_or_default();
    let sheet_part = resolve_worksheet_part(&workbook_xml, &rels_xml, sheet_name)?.ok_or_else(|| {
        ToolError::InvalidWorkbook(format!("cannot locate the worksheet part of '{sheet_name}'"))
    })?;
    let sheet_xml = read_part(&mut archive, &sheet_part)?.ok_or_else(|| {
        ToolError::InvalidWorkbook(format!("worksheet part '{sheet_part}' is missing"))
    })?;
    let cell_styles = parse_cell_styles(&sheet_xml, columns)?;

    debug!(
        style_count = styles.len(),
        styled_cells = cell_styles.len(),
        part = %sheet_part,
        "resolved cell fills"
    );
    Ok(SheetFills {
        styles,
        cell_styles,
    })
}

/// Parses `styles.xml` into the fill of every cell format.
pub fn parse_styles_xml(xml: &str) -> Result<StyleFills> {
    let fills = parse_fills(xml)?;
    let fill_ids = parse_cell_xf_fill_ids(xml)?;
    let by_style = fill_ids
        .into_iter()
        .map(|fill_id| fills.get(fill_id).cloned().unwrap_or_default())
        .collect();
    Ok(StyleFills { by_style })
}

#[derive(Default)]
struct FillBuilder {
    pattern: Option<String>,
    foreground: Option<FillColor>,
    gradient: bool,
}

impl FillBuilder {
    fn build(self) -> CellFill {
        if self.gradient {
            return CellFill::Other;
        }
        match self.pattern.as_deref() {
            None | Some("none") => CellFill::Unset,
            Some("solid") => CellFill::Solid(self.foreground.unwrap_or(FillColor::Unreadable)),
            Some(_) => CellFill::Other,
        }
    }
}

/// Parses the `<fills>` section in document order.
fn parse_fills(xml: &str) -> Result<Vec<CellFill>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_fills = false;
    let mut in_pattern = false;
    let mut current: Option<FillBuilder> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(STYLES_PART, err))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"fills" if !empty => in_fills = true,
                    b"fill" if in_fills => {
                        if empty {
                            fills.push(CellFill::Unset);
                        } else {
                            current = Some(FillBuilder::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(fill) = current.as_mut() {
                            fill.pattern = attribute(e, b"patternType");
                            in_pattern = !empty;
                        }
                    }
                    b"gradientFill" => {
                        if let Some(fill) = current.as_mut() {
                            fill.gradient = true;
                        }
                    }
                    b"fgColor" if in_pattern => {
                        if let Some(fill) = current.as_mut() {
                            fill.foreground = Some(parse_color(e));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"patternFill" => in_pattern = false,
                b"fill" => {
                    if let Some(fill) = current.take() {
                        fills.push(fill.build());
                    }
                }
                b"fills" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(fills)
}

/// Parses the `fillId` of every `<xf>` inside `<cellXfs>`.
fn parse_cell_xf_fill_ids(xml: &str) -> Result<Vec<usize>> {
    let mut fill_ids = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(STYLES_PART, err))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"cellXfs" if matches!(event, Event::Start(_)) => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let fill_id = attribute(e, b"fillId")
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(0);
                    fill_ids.push(fill_id);
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(fill_ids)
}

fn parse_color(e: &BytesStart) -> FillColor {
    if let Some(theme) = attribute(e, b"theme") {
        return theme
            .parse()
            .map(FillColor::Theme)
            .unwrap_or(FillColor::Unreadable);
    }
    if let Some(indexed) = attribute(e, b"indexed") {
        return indexed
            .parse()
            .map(FillColor::Indexed)
            .unwrap_or(FillColor::Unreadable);
    }
    if let Some(rgb) = attribute(e, b"rgb") {
        return FillColor::Rgb(rgb);
    }
    match attribute(e, b"auto").as_deref() {
        Some("1") | Some("true") => FillColor::Auto,
        _ => FillColor::Unreadable,
    }
}

/// Maps each styled cell of `columns` to its `cellXfs` index. Cells without
/// an explicit reference take the position after the previous cell.
pub fn parse_cell_styles(xml: &str, columns: &[u32]) -> Result<HashMap<(u32, u32), usize>> {
    let mut cell_styles = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut row = 0u32;
    let mut column = 0u32;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error("worksheet", err))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => {
                    row = attribute(e, b"r")
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(row + 1);
                    column = 0;
                }
                b"c" => {
                    let (cell_row, cell_column) = attribute(e, b"r")
                        .and_then(|reference| parse_cell_ref(&reference))
                        .unwrap_or((row, column + 1));
                    row = cell_row;
                    column = cell_column;

                    if columns.contains(&column) {
                        if let Some(style) = attribute(e, b"s").and_then(|value| value.parse().ok())
                        {
                            cell_styles.insert((row, column), style);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(cell_styles)
}

/// `"C12"` becomes `(12, 3)`, both 1-based.
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|ch: char| ch.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }
    let column = letters.chars().try_fold(0u32, |acc, ch| {
        acc.checked_mul(26)?
            .checked_add(ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1)
    })?;
    let row = digits.parse().ok()?;
    Some((row, column))
}

/// Path of the worksheet part for `sheet_name`, following the workbook
/// relationships.
fn resolve_worksheet_part(
    workbook_xml: &str,
    rels_xml: &str,
    sheet_name: &str,
) -> Result<Option<String>> {
    let mut relationship_id = None;
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(WORKBOOK_PART, err))?
        {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                if attribute(e, b"name").as_deref() == Some(sheet_name) {
                    relationship_id = e
                        .attributes()
                        .flatten()
                        .find(|attr| attr.key.local_name().as_ref() == b"id")
                        .map(|attr| attribute_value(&attr));
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    let Some(relationship_id) = relationship_id else {
        return Ok(None);
    };

    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| xml_error(WORKBOOK_RELS_PART, err))?
        {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attribute(e, b"Id").as_deref() == Some(relationship_id.as_str()) {
                    return Ok(attribute(e, b"Target").map(|target| match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{target}"),
                    }));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(None)
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .map(|attr| attribute_value(&attr))
}

/// Unescaped attribute text, so `R&amp;D` reads as `R&D`.
fn attribute_value(attr: &Attribute) -> String {
    attr.unescape_value()
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn xml_error(part: &str, err: quick_xml::Error) -> ToolError {
    ToolError::InvalidWorkbook(format!("{part}: {err}"))
}
