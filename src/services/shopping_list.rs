//! Shopping-list assembly and page layout.
//!
//! Layout is computed in PDF points on an A4 page (origin bottom-left) and is
//! independent of the output format; the PDF and plain-text renderers both
//! consume the same positioned lines.

use crate::models::shopping::{ShoppingContributionRow, ShoppingTotalRow};
use anyhow::{Context, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, Pt};
use std::collections::HashMap;
use std::path::Path;

pub const PAGE_WIDTH_PT: f32 = 595.0;
pub const PAGE_HEIGHT_PT: f32 = 842.0;

const TITLE_X: f32 = 100.0;
const TITLE_Y: f32 = 770.0;
const TITLE_SIZE: f32 = 20.0;

const ITEM_X: f32 = 80.0;
const ITEM_TOP_Y: f32 = 740.0;
const ITEM_SIZE: f32 = 15.0;
const ITEM_STEP: f32 = 20.0;

const BREAKDOWN_X: f32 = 95.0;
const BREAKDOWN_SIZE: f32 = 11.0;
const BREAKDOWN_STEP: f32 = 16.0;

const BOTTOM_MARGIN: f32 = 100.0;

/// One aggregated ingredient with the cart recipes that call for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
    /// `(recipe name, amount)` ordered by recipe name
    pub breakdown: Vec<(String, i32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pdf,
    Text,
}

impl OutputFormat {
    #[must_use]
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(str::to_ascii_lowercase).as_deref() {
            None | Some("" | "pdf") => Some(Self::Pdf),
            Some("txt" | "text") => Some(Self::Text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

/// Attach per-recipe contributions to their aggregated line.
///
/// Items are indexed by `(name, unit)`; contributions keep their input order
/// within each item.
#[must_use]
pub fn assemble(
    totals: Vec<ShoppingTotalRow>,
    contributions: Vec<ShoppingContributionRow>,
) -> Vec<ShoppingItem> {
    let mut items: Vec<ShoppingItem> = totals
        .into_iter()
        .map(|row| ShoppingItem {
            name: row.name,
            measurement_unit: row.measurement_unit,
            total: row.total,
            breakdown: Vec::new(),
        })
        .collect();

    let index: HashMap<(String, String), usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| ((item.name.clone(), item.measurement_unit.clone()), i))
        .collect();

    for row in contributions {
        if let Some(&i) = index.get(&(row.name, row.measurement_unit)) {
            items[i].breakdown.push((row.recipe_name, row.amount));
        }
    }

    items
}

#[must_use]
pub fn item_text(item: &ShoppingItem) -> String {
    format!("• {} - {} {}", item.name, item.total, item.measurement_unit)
}

fn breakdown_text(item: &ShoppingItem) -> String {
    item.breakdown
        .iter()
        .map(|(recipe, amount)| format!("{recipe} ({amount})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Position the title and every item line, starting a new page whenever the
/// cursor reaches the bottom margin. The title appears on the first page only.
#[must_use]
pub fn layout(title: &str, items: &[ShoppingItem], show_breakdown: bool) -> Vec<Page> {
    let mut pages = vec![Page {
        lines: vec![Line {
            text: title.to_string(),
            x: TITLE_X,
            y: TITLE_Y,
            size: TITLE_SIZE,
        }],
    }];
    let mut y = ITEM_TOP_Y;

    for item in items {
        let line = Line {
            text: item_text(item),
            x: ITEM_X,
            y,
            size: ITEM_SIZE,
        };
        place(&mut pages, &mut y, line, ITEM_STEP);

        if show_breakdown && !item.breakdown.is_empty() {
            let line = Line {
                text: breakdown_text(item),
                x: BREAKDOWN_X,
                y,
                size: BREAKDOWN_SIZE,
            };
            place(&mut pages, &mut y, line, BREAKDOWN_STEP);
        }
    }

    // A page break right after the last line leaves an empty trailing page.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.lines.is_empty()) {
        pages.pop();
    }

    pages
}

fn place(pages: &mut Vec<Page>, y: &mut f32, line: Line, step: f32) {
    if let Some(page) = pages.last_mut() {
        page.lines.push(line);
    }
    *y -= step;
    if *y <= BOTTOM_MARGIN {
        pages.push(Page::default());
        *y = ITEM_TOP_Y;
    }
}

/// Plain-text rendering: one line per entry, pages separated by form feed.
#[must_use]
pub fn render_text(pages: &[Page]) -> String {
    pages
        .iter()
        .map(|page| {
            page.lines
                .iter()
                .map(|line| {
                    if line.size < ITEM_SIZE {
                        format!("    {}", line.text)
                    } else {
                        line.text.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\u{c}\n")
}

/// Characters outside WinAnsi that the encoding still maps (0x80-0x9F).
const WIN_ANSI_EXTRAS: &str = "€‚ƒ„…†‡ˆ‰Š‹ŒŽ‘’“”•–—˜™š›œžŸ";

fn is_win_ansi(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}') || WIN_ANSI_EXTRAS.contains(c)
}

/// Whether every line can be drawn with a built-in PDF font.
///
/// Built-in fonts are WinAnsi encoded and printpdf drops any character
/// outside that set, so such text needs an embedded TTF.
#[must_use]
pub fn fits_builtin_font(title: &str, pages: &[Page]) -> bool {
    title.chars().all(is_win_ansi)
        && pages
            .iter()
            .flat_map(|page| &page.lines)
            .all(|line| line.text.chars().all(is_win_ansi))
}

/// PDF rendering with an embedded TTF when `font_path` is set, built-in
/// Helvetica otherwise.
pub fn render_pdf(title: &str, pages: &[Page], font_path: Option<&Path>) -> Result<Vec<u8>> {
    if font_path.is_none() && !fits_builtin_font(title, pages) {
        anyhow::bail!("Shopping list contains characters the built-in PDF font cannot encode");
    }

    let width = Mm::from(Pt(PAGE_WIDTH_PT));
    let height = Mm::from(Pt(PAGE_HEIGHT_PT));

    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Layer 1");
    let font = load_font(&doc, font_path)?;

    for (index, page) in pages.iter().enumerate() {
        let (page_idx, layer_idx) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, "Layer 1")
        };
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        for line in &page.lines {
            layer.use_text(
                line.text.clone(),
                line.size,
                Mm::from(Pt(line.x)),
                Mm::from(Pt(line.y)),
                &font,
            );
        }
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow::anyhow!("Failed to serialize PDF: {e:?}"))
}

fn load_font(doc: &PdfDocumentReference, font_path: Option<&Path>) -> Result<IndirectFontRef> {
    match font_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open font {}", path.display()))?;
            doc.add_external_font(file)
                .map_err(|e| anyhow::anyhow!("Failed to load font {}: {e:?}", path.display()))
        }
        None => doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow::anyhow!("Failed to load built-in font: {e:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, total: i64) -> ShoppingItem {
        ShoppingItem {
            name: name.to_string(),
            measurement_unit: "g".to_string(),
            total,
            breakdown: vec![],
        }
    }

    fn items(count: usize) -> Vec<ShoppingItem> {
        (0..count).map(|i| item(&format!("item{i}"), 1)).collect()
    }

    #[test]
    fn test_assemble_attaches_breakdown() {
        let totals = vec![
            ShoppingTotalRow {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
                total: 250,
            },
            ShoppingTotalRow {
                name: "milk".to_string(),
                measurement_unit: "ml".to_string(),
                total: 200,
            },
        ];
        let contributions = vec![
            ShoppingContributionRow {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
                recipe_name: "Bread".to_string(),
                amount: 100,
            },
            ShoppingContributionRow {
                name: "flour".to_string(),
                measurement_unit: "g".to_string(),
                recipe_name: "Pancakes".to_string(),
                amount: 150,
            },
        ];

        let items = assemble(totals, contributions);
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].breakdown,
            vec![("Bread".to_string(), 100), ("Pancakes".to_string(), 150)]
        );
        assert!(items[1].breakdown.is_empty());
    }

    #[test]
    fn test_item_text_format() {
        assert_eq!(item_text(&item("flour", 250)), "• flour - 250 g");
    }

    #[test]
    fn test_empty_list_has_only_title() {
        let pages = layout("Shopping list", &[], false);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1);
        assert_eq!(pages[0].lines[0].y, TITLE_Y);
    }

    #[test]
    fn test_first_item_position() {
        let pages = layout("T", &items(1), false);
        let line = &pages[0].lines[1];
        assert_eq!((line.x, line.y, line.size), (80.0, 740.0, 15.0));
    }

    #[test]
    fn test_page_break_threshold() {
        // Lines at 740, 720, ..., 120 fit on the first page.
        let pages = layout("T", &items(32), false);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1 + 32);
        assert_eq!(pages[0].lines.last().map(|l| l.y), Some(120.0));

        let pages = layout("T", &items(33), false);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].lines.len(), 1);
        assert_eq!(pages[1].lines[0].y, 740.0);
        assert!(pages[1].lines.iter().all(|l| l.text != "T"));
    }

    #[test]
    fn test_breakdown_lines_are_indented() {
        let mut flour = item("flour", 250);
        flour.breakdown = vec![("Bread".to_string(), 100), ("Pancakes".to_string(), 150)];

        let pages = layout("T", &[flour.clone()], true);
        let breakdown = &pages[0].lines[2];
        assert_eq!(breakdown.text, "Bread (100), Pancakes (150)");
        assert_eq!((breakdown.x, breakdown.y, breakdown.size), (95.0, 720.0, 11.0));

        let pages = layout("T", &[flour], false);
        assert_eq!(pages[0].lines.len(), 2);
    }

    #[test]
    fn test_render_text_separates_pages() {
        let text = render_text(&layout("T", &items(40), false));
        assert_eq!(text.matches('\u{c}').count(), 1);
        assert!(text.starts_with("T\n• item0 - 1 g"));
    }

    #[test]
    fn test_render_pdf_produces_document() {
        let pages = layout("Shopping list", &items(40), false);
        let bytes = render_pdf("Shopping list", &pages, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_builtin_font_coverage() {
        let latin = vec![item("flour", 250), item("crème fraîche", 200)];
        assert!(fits_builtin_font("Shopping list", &layout("Shopping list", &latin, false)));

        let cyrillic = vec![item("Мука", 250)];
        let pages = layout("Shopping list", &cyrillic, false);
        assert!(!fits_builtin_font("Shopping list", &pages));
        assert!(!fits_builtin_font("Список покупок", &layout("Список покупок", &[], false)));
    }

    #[test]
    fn test_render_pdf_refuses_lossy_builtin_font() {
        let pages = layout("Shopping list", &[item("Мука", 250)], false);
        assert!(render_pdf("Shopping list", &pages, None).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse(None), Some(OutputFormat::Pdf));
        assert_eq!(OutputFormat::parse(Some("TXT")), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse(Some("docx")), None);
    }
}
