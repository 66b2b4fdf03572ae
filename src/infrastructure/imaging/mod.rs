//! Comic page compositing.
//!
//! Panels are laid out two per row, left to right then top to bottom. Each
//! row leaves a caption band below the art; the page grows with the number
//! of rows. Text (title, panel labels, captions) is drawn only when a font
//! could be loaded.

use ab_glyph::{FontArc, PxScale};
use anyhow::Result;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use std::path::Path;
use tracing::{info, warn};

pub const PAGE_WIDTH: u32 = 2400;
pub const PANEL_WIDTH: u32 = 1100;
pub const PANEL_HEIGHT: u32 = 500;
pub const MARGIN: u32 = 50;
pub const CAPTION_BAND: u32 = 100;
pub const TITLE_BAND: u32 = 100;
pub const PANELS_PER_ROW: u32 = 2;

pub const PAGE_TITLE: &str = "My AI Comic Story";
const CAPTION_WIDTH: usize = 50;
const CAPTION_LINE_HEIGHT: u32 = 28;

const TITLE_SCALE: f32 = 48.0;
const LABEL_SCALE: f32 = 32.0;
const SMALL_SCALE: f32 = 24.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const RED: Rgb<u8> = Rgb([220, 30, 30]);
const OUTLINE: u32 = 2;

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// One cell of the page: encoded art (if any) and the caption under it.
#[derive(Debug, Clone, Default)]
pub struct PanelArt {
    pub image: Option<Vec<u8>>,
    pub caption: String,
}

/// Loads the configured font, falling back to common system fonts.
pub fn load_font(configured: Option<&Path>) -> Option<FontArc> {
    let candidates = configured
        .into_iter()
        .map(Path::to_path_buf)
        .chain(SYSTEM_FONTS.iter().map(|p| Path::new(p).to_path_buf()));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontArc::try_from_vec(bytes) {
            Ok(font) => {
                info!("🔤 Using font {}", path.display());
                return Some(font);
            }
            Err(e) => warn!("Font {} could not be parsed: {}", path.display(), e),
        }
    }

    warn!("No usable font found, comic page will have no text");
    None
}

pub fn page_height(panel_count: usize) -> u32 {
    let rows = (panel_count.max(1) as u32).div_ceil(PANELS_PER_ROW);
    TITLE_BAND + MARGIN + rows * (PANEL_HEIGHT + MARGIN + CAPTION_BAND)
}

/// Top-left corner of the cell for the zero-based panel `index`.
pub fn panel_origin(index: usize) -> (u32, u32) {
    let index = index as u32;
    let row = index / PANELS_PER_ROW;
    let col = index % PANELS_PER_ROW;
    (
        MARGIN + col * (PANEL_WIDTH + MARGIN),
        TITLE_BAND + MARGIN + row * (PANEL_HEIGHT + MARGIN + CAPTION_BAND),
    )
}

/// Greedy word wrap at `width` characters. Words longer than a line are split.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let line_len = line.chars().count();
        if line_len > 0 && line_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.extend(word);
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Builds the page. Missing art becomes a black-outlined placeholder and
/// undecodable art a red one; neither aborts the page.
pub fn compose_comic_page(panels: &[PanelArt], font: Option<&FontArc>) -> RgbImage {
    let mut page = RgbImage::from_pixel(PAGE_WIDTH, page_height(panels.len()), WHITE);

    if let Some(font) = font {
        let (w, h) = text_size(PxScale::from(TITLE_SCALE), font, PAGE_TITLE);
        let x = PAGE_WIDTH.saturating_sub(w) / 2;
        let y = TITLE_BAND.saturating_sub(h) / 2;
        draw_text_mut(&mut page, BLACK, x as i32, y as i32, TITLE_SCALE, font, PAGE_TITLE);
    }

    for (i, panel) in panels.iter().enumerate() {
        let number = i + 1;
        let (x, y) = panel_origin(i);

        match &panel.image {
            Some(bytes) => match image::load_from_memory(bytes) {
                Ok(img) => {
                    let art = img
                        .resize_exact(PANEL_WIDTH, PANEL_HEIGHT, FilterType::Lanczos3)
                        .to_rgb8();
                    imageops::overlay(&mut page, &art, x as i64, y as i64);
                }
                Err(e) => {
                    warn!("Panel {} could not be decoded: {}", number, e);
                    draw_outline(&mut page, x, y, RED);
                    if let Some(font) = font {
                        let reason: String = e.to_string().chars().take(20).collect();
                        let (tx, ty) = ((x + 10) as i32, (y + PANEL_HEIGHT / 2) as i32);
                        draw_text_mut(&mut page, RED, tx, ty, SMALL_SCALE, font, &format!("Error: {}", reason));
                    }
                }
            },
            None => {
                draw_outline(&mut page, x, y, BLACK);
                if let Some(font) = font {
                    let (tx, ty) = ((x + 10) as i32, (y + PANEL_HEIGHT / 2) as i32);
                    draw_text_mut(&mut page, BLACK, tx, ty, LABEL_SCALE, font, &format!("Panel {}", number));
                }
            }
        }

        if let Some(font) = font {
            draw_caption(&mut page, font, number, x, y, &panel.caption);
        }
    }

    page
}

fn draw_caption(page: &mut RgbImage, font: &FontArc, number: usize, x: u32, y: u32, caption: &str) {
    let label_y = y.saturating_sub(30) as i32;
    draw_text_mut(page, BLACK, (x + 5) as i32, label_y, SMALL_SCALE, font, &format!("Panel {}", number));

    let max_lines = ((CAPTION_BAND - 10) / CAPTION_LINE_HEIGHT) as usize;
    for (line_no, line) in wrap_words(caption, CAPTION_WIDTH).iter().take(max_lines).enumerate() {
        let line_y = y + PANEL_HEIGHT + 10 + line_no as u32 * CAPTION_LINE_HEIGHT;
        draw_text_mut(page, BLACK, x as i32, line_y as i32, SMALL_SCALE, font, line);
    }
}

fn draw_outline(page: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>) {
    for dx in 0..PANEL_WIDTH {
        for t in 0..OUTLINE {
            page.put_pixel(x + dx, y + t, color);
            page.put_pixel(x + dx, y + PANEL_HEIGHT - 1 - t, color);
        }
    }
    for dy in 0..PANEL_HEIGHT {
        for t in 0..OUTLINE {
            page.put_pixel(x + t, y + dy, color);
            page.put_pixel(x + PANEL_WIDTH - 1 - t, y + dy, color);
        }
    }
}

pub fn encode_png(page: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    page.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
pub(crate) fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(width, height, Rgb(color))).unwrap()
}

#[cfg(test)]
pub(crate) fn fixture_font_path() -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSansMono.ttf")
}
