//! FILENAME: core/persistence/src/ooxml.rs
//! PURPOSE: Reads the parts of an XLSX package that calamine does not expose.
//! CONTEXT: calamine supplies cell values and formulas. Cell styles, number
//! formats, column widths and row heights live in the raw package, so this
//! module opens the zip and scans styles.xml and each worksheet part with
//! quick-xml. Only what the sheet model can represent is kept.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use engine::{CellAddress, CellStyle, Color, FontStyle};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::PersistenceError;

type Result<T> = std::result::Result<T, PersistenceError>;

/// One entry of `cellXfs`, the table cells refer to with their `s` attribute.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XfStyle {
    pub style: CellStyle,
    pub number_format: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct StyleSheet {
    pub xfs: Vec<XfStyle>,
}

/// A `<col>` element: 0-based inclusive column span.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnSpec {
    pub first: usize,
    pub last: usize,
    pub width: Option<f64>,
    pub style: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct SheetLayout {
    pub columns: Vec<ColumnSpec>,
    pub row_heights: HashMap<usize, f64>,
    /// xf index per (row, col) for every cell carrying an `s` attribute.
    pub cell_styles: HashMap<(usize, usize), usize>,
}

pub(crate) struct Package<R> {
    archive: ZipArchive<R>,
}

impl Package<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Package {
            archive: ZipArchive::new(file)?,
        })
    }
}

impl<R: Read + Seek> Package<R> {
    fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut part = match self.archive.by_name(name) {
            Ok(part) => part,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        Ok(Some(xml))
    }

    /// Maps each sheet name to the archive path of its worksheet part.
    pub fn sheet_parts(&mut self) -> Result<HashMap<String, String>> {
        let workbook = self.read_part("xl/workbook.xml")?.ok_or_else(|| {
            PersistenceError::InvalidFormat("missing xl/workbook.xml".to_string())
        })?;
        let rels = self
            .read_part("xl/_rels/workbook.xml.rels")?
            .unwrap_or_default();

        let targets = parse_relationships(&rels)?;
        let mut parts = HashMap::new();
        for (name, rel_id) in parse_sheet_refs(&workbook)? {
            if let Some(target) = targets.get(&rel_id) {
                parts.insert(name, resolve_target(target));
            }
        }
        Ok(parts)
    }

    pub fn styles(&mut self) -> Result<StyleSheet> {
        match self.read_part("xl/styles.xml")? {
            Some(xml) => parse_styles(&xml),
            None => Ok(StyleSheet::default()),
        }
    }

    pub fn sheet_layout(&mut self, part: &str) -> Result<SheetLayout> {
        match self.read_part(part)? {
            Some(xml) => parse_sheet_layout(&xml),
            None => Ok(SheetLayout::default()),
        }
    }
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

fn attr(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            let raw = std::str::from_utf8(&attr.value).map_err(quick_xml::Error::from)?;
            let value = quick_xml::escape::unescape(raw).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attr_usize(e: &BytesStart, key: &[u8]) -> Result<Option<usize>> {
    Ok(attr(e, key)?.and_then(|v| v.parse().ok()))
}

fn attr_f64(e: &BytesStart, key: &[u8]) -> Result<Option<f64>> {
    Ok(attr(e, key)?.and_then(|v| v.parse().ok()))
}

fn attr_flag(e: &BytesStart, key: &[u8]) -> Result<Option<bool>> {
    Ok(attr(e, key)?.map(|v| v == "1" || v.eq_ignore_ascii_case("true")))
}

/// `<b/>` means on; `<b val="0"/>` means off.
fn toggle(e: &BytesStart) -> Result<bool> {
    Ok(attr_flag(e, b"val")?.unwrap_or(true))
}

fn rgb(e: &BytesStart) -> Result<Option<Color>> {
    Ok(attr(e, b"rgb")?.and_then(|v| Color::from_hex(&v)))
}

// ============================================================================
// WORKBOOK PARTS
// ============================================================================

fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id")?, attr(e, b"Target")?) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// (sheet name, relationship id) in workbook order.
fn parse_sheet_refs(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attr(e, b"name")?, attr(e, b"id")?) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

// ============================================================================
// STYLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Other,
    Fonts,
    Fills,
    CellXfs,
}

#[derive(Debug, Default)]
struct RawFill {
    solid: bool,
    color: Option<Color>,
}

#[derive(Debug, Default)]
struct RawXf {
    font: usize,
    fill: usize,
    num_fmt: usize,
    apply_fill: bool,
    wrap: bool,
}

/// Format codes Excel assigns to the built-in date ids.
fn builtin_date_format(id: usize) -> Option<&'static str> {
    match id {
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        _ => None,
    }
}

fn parse_styles(xml: &str) -> Result<StyleSheet> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut num_fmts: HashMap<usize, String> = HashMap::new();
    let mut fonts: Vec<FontStyle> = Vec::new();
    let mut fills: Vec<Option<Color>> = Vec::new();
    let mut raw_xfs: Vec<RawXf> = Vec::new();

    let mut section = Section::Other;
    let mut font: Option<FontStyle> = None;
    let mut fill: Option<RawFill> = None;
    let mut xf: Option<RawXf> = None;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"numFmt" => {
                        if let (Some(id), Some(code)) =
                            (attr_usize(e, b"numFmtId")?, attr(e, b"formatCode")?)
                        {
                            num_fmts.insert(id, code);
                        }
                    }
                    b"fonts" if !empty => section = Section::Fonts,
                    b"fills" if !empty => section = Section::Fills,
                    b"cellXfs" if !empty => section = Section::CellXfs,

                    b"font" if section == Section::Fonts => {
                        if empty {
                            fonts.push(FontStyle::default());
                        } else {
                            font = Some(FontStyle::default());
                        }
                    }
                    b"b" => {
                        if let Some(f) = font.as_mut() {
                            f.bold = toggle(e)?;
                        }
                    }
                    b"i" => {
                        if let Some(f) = font.as_mut() {
                            f.italic = toggle(e)?;
                        }
                    }
                    b"u" => {
                        if let Some(f) = font.as_mut() {
                            f.underline = attr(e, b"val")?.as_deref() != Some("none");
                        }
                    }
                    b"color" => {
                        if let (Some(f), Some(color)) = (font.as_mut(), rgb(e)?) {
                            f.color = color;
                        }
                    }

                    b"fill" if section == Section::Fills => {
                        if empty {
                            fills.push(None);
                        } else {
                            fill = Some(RawFill::default());
                        }
                    }
                    b"patternFill" => {
                        if let Some(state) = fill.as_mut() {
                            state.solid = attr(e, b"patternType")?.as_deref() == Some("solid");
                        }
                    }
                    b"fgColor" => {
                        if let Some(state) = fill.as_mut() {
                            state.color = rgb(e)?;
                        }
                    }

                    b"xf" if section == Section::CellXfs => {
                        let parsed = RawXf {
                            font: attr_usize(e, b"fontId")?.unwrap_or(0),
                            fill: attr_usize(e, b"fillId")?.unwrap_or(0),
                            num_fmt: attr_usize(e, b"numFmtId")?.unwrap_or(0),
                            apply_fill: attr_flag(e, b"applyFill")?.unwrap_or(false),
                            wrap: false,
                        };
                        if empty {
                            raw_xfs.push(parsed);
                        } else {
                            xf = Some(parsed);
                        }
                    }
                    b"alignment" => {
                        if let Some(x) = xf.as_mut() {
                            x.wrap = attr_flag(e, b"wrapText")?.unwrap_or(false);
                        }
                    }
                    _ => {}
                }
            }

            Event::End(ref e) => match e.local_name().as_ref() {
                b"font" => {
                    if let Some(f) = font.take() {
                        fonts.push(f);
                    }
                }
                b"fill" => {
                    if let Some(state) = fill.take() {
                        fills.push(state.color.filter(|_| state.solid));
                    }
                }
                b"xf" => {
                    if let Some(x) = xf.take() {
                        raw_xfs.push(x);
                    }
                }
                b"fonts" | b"fills" | b"cellXfs" => section = Section::Other,
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    let xfs = raw_xfs
        .into_iter()
        .map(|raw| {
            let style = CellStyle {
                font: fonts.get(raw.font).cloned().unwrap_or_default(),
                background: fills.get(raw.fill).copied().flatten(),
                apply_fill: raw.apply_fill,
                wrap_text: raw.wrap,
            };
            let number_format = num_fmts
                .get(&raw.num_fmt)
                .cloned()
                .or_else(|| builtin_date_format(raw.num_fmt).map(str::to_string));
            XfStyle {
                style,
                number_format,
            }
        })
        .collect();

    Ok(StyleSheet { xfs })
}

// ============================================================================
// WORKSHEET LAYOUT
// ============================================================================

fn parse_sheet_layout(xml: &str) -> Result<SheetLayout> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut layout = SheetLayout::default();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"col" => {
                    // min/max are 1-based and inclusive.
                    let (Some(min), Some(max)) = (attr_usize(e, b"min")?, attr_usize(e, b"max")?)
                    else {
                        continue;
                    };
                    if min == 0 || max < min {
                        continue;
                    }
                    layout.columns.push(ColumnSpec {
                        first: min - 1,
                        last: max - 1,
                        width: attr_f64(e, b"width")?,
                        style: attr_usize(e, b"style")?,
                    });
                }
                b"row" => {
                    if let (Some(r), Some(height)) = (attr_usize(e, b"r")?, attr_f64(e, b"ht")?) {
                        if r > 0 {
                            layout.row_heights.insert(r - 1, height);
                        }
                    }
                }
                b"c" => {
                    let reference = attr(e, b"r")?;
                    let style = attr_usize(e, b"s")?;
                    if let (Some(address), Some(style)) =
                        (reference.as_deref().and_then(CellAddress::from_a1), style)
                    {
                        layout.cell_styles.insert((address.row, address.col), style);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><i val="0"/><u/><color rgb="FFFF0000"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="1" fillId="2"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" applyFill="1" xfId="0"><alignment wrapText="1"/></xf>
    <xf numFmtId="164" fontId="0" fillId="2" xfId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn parses_cell_xfs() {
        let styles = parse_styles(STYLES).unwrap();
        assert_eq!(styles.xfs.len(), 4);

        assert_eq!(styles.xfs[0].style, CellStyle::new());

        let bold = &styles.xfs[1].style;
        assert!(bold.font.bold);
        assert!(!bold.font.italic);
        assert!(bold.font.underline);
        assert_eq!(bold.font.color, Color::new(255, 0, 0));
        assert_eq!(bold.background, Some(Color::new(255, 255, 0)));
        assert!(bold.apply_fill);
        assert!(bold.wrap_text);

        let dated = &styles.xfs[2];
        assert!(!dated.style.apply_fill);
        assert_eq!(dated.number_format.as_deref(), Some("dd/mm/yyyy"));
        assert_eq!(styles.xfs[3].number_format.as_deref(), Some("mm-dd-yy"));
    }

    #[test]
    fn parses_layout() {
        let xml = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols><col min="2" max="3" width="18.5" style="1" customWidth="1"/></cols>
  <sheetData>
    <row r="1" ht="30" customHeight="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="C1"><v>1</v></c></row>
    <row r="2"><c r="B2" s="2"/></row>
  </sheetData>
</worksheet>"#;
        let layout = parse_sheet_layout(xml).unwrap();

        assert_eq!(
            layout.columns,
            vec![ColumnSpec {
                first: 1,
                last: 2,
                width: Some(18.5),
                style: Some(1)
            }]
        );
        assert_eq!(layout.row_heights.get(&0), Some(&30.0));
        assert_eq!(layout.row_heights.get(&1), None);
        assert_eq!(layout.cell_styles.get(&(0, 0)), Some(&1));
        assert_eq!(layout.cell_styles.get(&(1, 1)), Some(&2));
        assert_eq!(layout.cell_styles.get(&(0, 2)), None);
    }

    #[test]
    fn resolves_sheet_parts() {
        let workbook = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Report" sheetId="1" r:id="rId1"/><sheet name="Data" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;
        let rels = r#"<Relationships>
  <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="worksheet" Target="/xl/worksheets/sheet2.xml"/>
</Relationships>"#;

        let refs = parse_sheet_refs(workbook).unwrap();
        assert_eq!(refs[0], ("Report".to_string(), "rId1".to_string()));

        let targets = parse_relationships(rels).unwrap();
        assert_eq!(resolve_target(&targets["rId1"]), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target(&targets["rId2"]), "xl/worksheets/sheet2.xml");
    }
}
