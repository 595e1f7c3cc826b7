//! Paginated table documents written with `lopdf`.
//!
//! Only the two standard Helvetica faces are used, so no font files are
//! embedded. Text is encoded as WinAnsi; characters outside that code page
//! print as `?`.

use crate::errors::ServiceError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

const MARGIN: f32 = 50.0;
const FOOTER_SPACE: f32 = 30.0;
const CELL_PADDING: f32 = 4.0;
const LINE_FACTOR: f32 = 1.25;
/// Average Helvetica advance as a fraction of the font size
const AVG_CHAR_WIDTH: f32 = 0.52;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

pub const LETTER: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

pub const A4: PageSize = PageSize {
    width: 595.0,
    height: 842.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub header: String,
    /// Share of the usable page width
    pub weight: f32,
    pub align: Align,
}

impl TableColumn {
    pub fn new(header: &str, weight: f32, align: Align) -> Self {
        Self {
            header: header.to_string(),
            weight,
            align,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
    /// Rows drawn in bold without banding, e.g. totals
    pub emphasized: Vec<usize>,
    pub header_font_size: f32,
    pub body_font_size: f32,
}

impl Table {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }
}

/// Everything that ends up on the pages, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub page_size: PageSize,
    pub title: String,
    pub subtitle: Option<String>,
    /// Label/value lines printed above the table
    pub facts: Vec<(String, String)>,
    pub table: Table,
    /// Paragraphs printed after the table
    pub notes: Vec<String>,
    /// Printed at the bottom of every page
    pub footer: String,
}

/// WinAnsi bytes for a string.
fn encode(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

/// Latin-1 maps straight through except the C1 block, where WinAnsi
/// places typographic punctuation and a few extra letters.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        '\u{0080}'..='\u{009F}' => b'?',
        c if (c as u32) < 0x100 => c as u8,
        _ => b'?',
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_CHAR_WIDTH
}

/// Greedy word wrap by estimated width; words longer than a line are split.
fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let max_chars = ((max_width / (size * AVG_CHAR_WIDTH)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&word);
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Accumulates drawing operations page by page.
struct Canvas {
    size: PageSize,
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl Canvas {
    fn new(size: PageSize) -> Self {
        Self {
            size,
            pages: vec![Vec::new()],
            y: size.height - MARGIN,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // `pages` always holds at least the first page
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = self.size.height - MARGIN;
    }

    fn bottom(&self) -> f32 {
        MARGIN + FOOTER_SPACE
    }

    fn usable_width(&self) -> f32 {
        self.size.width - 2.0 * MARGIN
    }

    fn ensure_room(&mut self, height: f32) -> bool {
        if self.y - height < self.bottom() {
            self.new_page();
            true
        } else {
            false
        }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, y: f32, text: &str) {
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode(text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn fill_rect(&mut self, gray: f32, x: f32, y: f32, w: f32, h: f32) {
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("g", vec![gray.into()]));
        ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let ops = self.ops();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("G", vec![0.4f32.into()]));
        ops.push(Operation::new("w", vec![0.5f32.into()]));
        ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        ops.push(Operation::new("S", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Writes wrapped lines at the cursor, breaking pages as needed.
    fn paragraph(&mut self, font: &str, size: f32, text: &str) {
        let leading = size * LINE_FACTOR;
        for line in wrap(text, size, self.usable_width()) {
            self.ensure_room(leading);
            self.y -= leading;
            let y = self.y;
            self.text(font, size, MARGIN, y, &line);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }
}

fn column_widths(table: &Table, usable: f32) -> Vec<f32> {
    let total: f32 = table.columns.iter().map(|c| c.weight.max(0.0)).sum();
    table
        .columns
        .iter()
        .map(|c| {
            if total > 0.0 {
                usable * c.weight.max(0.0) / total
            } else {
                usable / table.columns.len() as f32
            }
        })
        .collect()
}

fn draw_row(
    canvas: &mut Canvas,
    table: &Table,
    widths: &[f32],
    cells: &[Vec<String>],
    font: &str,
    size: f32,
    shade: Option<f32>,
    height: f32,
) {
    let leading = size * LINE_FACTOR;
    let top = canvas.y;
    let mut x = MARGIN;

    for (index, width) in widths.iter().enumerate() {
        if let Some(gray) = shade {
            canvas.fill_rect(gray, x, top - height, *width, height);
        }
        canvas.stroke_rect(x, top - height, *width, height);

        let lines = cells.get(index).map(Vec::as_slice).unwrap_or(&[]);
        let align = table
            .columns
            .get(index)
            .map(|c| c.align)
            .unwrap_or(Align::Left);
        for (line_no, line) in lines.iter().enumerate() {
            let line_width = text_width(line, size);
            let tx = match align {
                Align::Left => x + CELL_PADDING,
                Align::Center => x + (*width - line_width).max(0.0) / 2.0,
                Align::Right => x + (*width - CELL_PADDING - line_width).max(CELL_PADDING),
            };
            let ty = top - CELL_PADDING - leading * (line_no as f32 + 1.0) + (leading - size);
            canvas.text(font, size, tx, ty, line);
        }
        x += width;
    }

    canvas.y -= height;
}

fn layout_cells(row: &[String], widths: &[f32], size: f32) -> (Vec<Vec<String>>, f32) {
    let cells: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(index, width)| {
            let text = row.get(index).map(String::as_str).unwrap_or("");
            wrap(text, size, (*width - 2.0 * CELL_PADDING).max(size))
        })
        .collect();
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    let height = lines as f32 * size * LINE_FACTOR + 2.0 * CELL_PADDING;
    (cells, height)
}

fn draw_table(canvas: &mut Canvas, table: &Table) {
    let widths = column_widths(table, canvas.usable_width());
    let header: Vec<String> = table.columns.iter().map(|c| c.header.clone()).collect();
    let (header_cells, header_height) = layout_cells(&header, &widths, table.header_font_size);

    canvas.ensure_room(header_height);
    draw_row(
        canvas,
        table,
        &widths,
        &header_cells,
        BOLD,
        table.header_font_size,
        Some(0.75),
        header_height,
    );

    for (index, row) in table.rows.iter().enumerate() {
        let (cells, height) = layout_cells(row, &widths, table.body_font_size);
        if canvas.ensure_room(height) {
            // Repeat the header on every page the table spans
            draw_row(
                canvas,
                table,
                &widths,
                &header_cells,
                BOLD,
                table.header_font_size,
                Some(0.75),
                header_height,
            );
        }
        let emphasized = table.emphasized.contains(&index);
        let shade = if !emphasized && index % 2 == 1 {
            Some(0.92)
        } else {
            None
        };
        let font = if emphasized { BOLD } else { REGULAR };
        draw_row(
            canvas,
            table,
            &widths,
            &cells,
            font,
            table.body_font_size,
            shade,
            height,
        );
    }
}

/// Lays the sheet out and returns its page operations.
fn layout(sheet: &Sheet) -> Vec<Vec<Operation>> {
    let mut canvas = Canvas::new(sheet.page_size);

    canvas.paragraph(BOLD, 18.0, &sheet.title);
    if let Some(subtitle) = &sheet.subtitle {
        canvas.gap(2.0);
        canvas.paragraph(REGULAR, 10.0, subtitle);
    }
    if !sheet.facts.is_empty() {
        canvas.gap(6.0);
        for (label, value) in &sheet.facts {
            canvas.paragraph(REGULAR, 10.0, &format!("{}: {}", label, value));
        }
    }
    canvas.gap(14.0);

    draw_table(&mut canvas, &sheet.table);

    if !sheet.notes.is_empty() {
        canvas.gap(14.0);
        for note in &sheet.notes {
            canvas.paragraph(REGULAR, 10.0, note);
            canvas.gap(4.0);
        }
    }

    let total = canvas.pages.len();
    let footer_y = MARGIN;
    let right_edge = sheet.page_size.width - MARGIN;
    let mut pages = std::mem::take(&mut canvas.pages);
    for (index, ops) in pages.iter_mut().enumerate() {
        let mut footer = Canvas {
            size: sheet.page_size,
            pages: vec![Vec::new()],
            y: footer_y,
        };
        footer.text(REGULAR, 8.0, MARGIN, footer_y, &sheet.footer);
        let numbering = format!("Página {} de {}", index + 1, total);
        let x = right_edge - text_width(&numbering, 8.0);
        footer.text(REGULAR, 8.0, x, footer_y, &numbering);
        ops.append(&mut footer.pages[0]);
    }
    pages
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Renders a sheet to PDF bytes.
pub fn render(sheet: &Sheet) -> Result<Vec<u8>, ServiceError> {
    let pages = layout(sheet);

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ServiceError::ReportError(format!("content stream: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(sheet.page_size.width),
                Object::Real(sheet.page_size.height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ServiceError::ReportError(format!("write pdf: {}", e)))?;
    Ok(bytes)
}
