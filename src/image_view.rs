use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use ratatui::{buffer::Buffer, layout::Rect, style::Color, widgets::Widget};

const UPPER_HALF: &str = "▀";

/// Draws a bitmap with two pixels per terminal cell: the upper half block
/// takes the top pixel as foreground and the bottom pixel as background.
pub struct ImageView<'a> {
    image: &'a DynamicImage,
}

impl<'a> ImageView<'a> {
    pub fn new(image: &'a DynamicImage) -> Self {
        Self { image }
    }
}

/// Scales `image` to fit `cols` x `rows` cells, keeping its aspect ratio
pub fn fit_to_cells(image: &DynamicImage, cols: u16, rows: u16) -> Option<RgbImage> {
    let max_w = u32::from(cols);
    let max_h = u32::from(rows) * 2;
    if max_w == 0 || max_h == 0 || image.width() == 0 || image.height() == 0 {
        return None;
    }
    Some(image.resize(max_w, max_h, FilterType::Triangle).to_rgb8())
}

impl Widget for ImageView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(pixels) = fit_to_cells(self.image, area.width, area.height) else {
            return;
        };

        let cols = pixels.width() as u16;
        let rows = pixels.height().div_ceil(2) as u16;
        let x0 = area.x + area.width.saturating_sub(cols) / 2;
        let y0 = area.y + area.height.saturating_sub(rows) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let top = pixels.get_pixel(u32::from(col), u32::from(row) * 2);
                let bottom_y = u32::from(row) * 2 + 1;
                let bg = if bottom_y < pixels.height() {
                    let p = pixels.get_pixel(u32::from(col), bottom_y);
                    Color::Rgb(p[0], p[1], p[2])
                } else {
                    Color::Reset
                };

                buf.get_mut(x0 + col, y0 + row)
                    .set_symbol(UPPER_HALF)
                    .set_fg(Color::Rgb(top[0], top[1], top[2]))
                    .set_bg(bg);
            }
        }
    }
}
