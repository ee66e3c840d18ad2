use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{DrawColor, DrawItem, DrawKind, DrawList, DrawRect, Vec2};

use super::{world_to_screen, Viewport};

const CLEAR_COLOR: [u8; 4] = [12, 14, 18, 255];
const SPRITE_OUTLINE_COLOR: [u8; 4] = [20, 20, 20, 255];
const SHADOW_COLOR: [u8; 3] = [50, 50, 50];
const TEXT_GLYPH_WIDTH_PX: i32 = 7;
const TEXT_LINE_HEIGHT_PX: i32 = 12;
const TEXT_BACKGROUND: [u8; 3] = [0, 0, 0];
const TEXT_BACKGROUND_ALPHA: u8 = 155;

/// Flat-colour front end for a [`DrawList`]. Sprites are drawn as their
/// cell boxes; there is no asset decoding here.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScreenRectPx {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(&mut self, list: &DrawList) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let viewport = self.viewport;
        let frame = self.pixels.frame_mut();
        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        let camera = list.camera();
        for item in list.sorted_items() {
            draw_item(frame, viewport, camera, item);
        }
        for rect in list.rects() {
            draw_rect(frame, viewport, camera, rect);
        }
        if list.darkness() > 0 {
            let whole = ScreenRectPx {
                left: 0,
                top: 0,
                right: viewport.width as i32,
                bottom: viewport.height as i32,
            };
            blend_rect_clipped(frame, viewport, whole, [0, 0, 0], list.darkness());
        }
        for line in list.text() {
            draw_text_bar(frame, viewport, line.position_px, &line.text, line.color);
        }

        self.pixels.render()
    }
}

fn screen_rect(camera: Vec2, position: Vec2, size: Vec2) -> ScreenRectPx {
    let (left, top) = world_to_screen(position, camera);
    ScreenRectPx {
        left,
        top,
        right: left + size.x.round() as i32,
        bottom: top + size.y.round() as i32,
    }
}

fn draw_item(frame: &mut [u8], viewport: Viewport, camera: Vec2, item: &DrawItem) {
    let position = Vec2::new(item.position.x, item.position.y + item.y_shift);
    let rect = screen_rect(camera, position, item.size);
    if !viewport.contains_span(rect.left, rect.top, rect.right, rect.bottom) {
        return;
    }

    if let Some(shadow) = item.shadow {
        let height = if shadow.flattened {
            2.0
        } else {
            shadow.length.max(1.0)
        };
        let shadow_rect = screen_rect(
            camera,
            Vec2::new(position.x + item.size.x * 0.25, position.y + item.size.y - 6.0),
            Vec2::new(item.size.x * 0.5, height),
        );
        blend_rect_clipped(frame, viewport, shadow_rect, SHADOW_COLOR, shadow.alpha);
    }

    fill_rect_clipped(frame, viewport, rect, item.color.rgba());
    if matches!(item.kind, DrawKind::Sorted) && item.cell.is_some() {
        outline_rect_clipped(frame, viewport, rect, SPRITE_OUTLINE_COLOR);
    }
}

fn draw_rect(frame: &mut [u8], viewport: Viewport, camera: Vec2, rect: &DrawRect) {
    let origin = if rect.screen_space { Vec2::ZERO } else { camera };
    let screen = screen_rect(
        origin,
        Vec2::new(rect.rect.x, rect.rect.y),
        Vec2::new(rect.rect.w, rect.rect.h),
    );
    if rect.filled {
        fill_rect_clipped(frame, viewport, screen, rect.color.rgba());
    } else {
        outline_rect_clipped(frame, viewport, screen, rect.color.rgba());
    }
}

fn draw_text_bar(frame: &mut [u8], viewport: Viewport, at: Vec2, text: &str, color: DrawColor) {
    let left = at.x.round() as i32;
    let top = at.y.round() as i32;
    let width = text.chars().count() as i32 * TEXT_GLYPH_WIDTH_PX;
    let background = ScreenRectPx {
        left: left - 4,
        top: top - 2,
        right: left + width + 4,
        bottom: top + TEXT_LINE_HEIGHT_PX + 2,
    };
    blend_rect_clipped(
        frame,
        viewport,
        background,
        TEXT_BACKGROUND,
        TEXT_BACKGROUND_ALPHA,
    );
    let glyph_row = ScreenRectPx {
        left,
        top: top + TEXT_LINE_HEIGHT_PX / 2 - 1,
        right: left + width,
        bottom: top + TEXT_LINE_HEIGHT_PX / 2 + 1,
    };
    fill_rect_clipped(frame, viewport, glyph_row, color.rgba());
}

fn write_pixel_rgba_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, color: [u8; 4]) {
    let Some(range) = pixel_byte_range(frame.len(), width, x, y) else {
        return;
    };
    frame[range].copy_from_slice(&color);
}

fn blend_pixel_clipped(frame: &mut [u8], width: usize, x: i32, y: i32, rgb: [u8; 3], alpha: u8) {
    let Some(range) = pixel_byte_range(frame.len(), width, x, y) else {
        return;
    };
    let pixel = &mut frame[range];
    let a = alpha as u16;
    for channel in 0..3 {
        let dst = pixel[channel] as u16;
        let src = rgb[channel] as u16;
        pixel[channel] = ((src * a + dst * (255 - a)) / 255) as u8;
    }
}

fn pixel_byte_range(
    frame_len: usize,
    width: usize,
    x: i32,
    y: i32,
) -> Option<std::ops::Range<usize>> {
    if x < 0 || y < 0 || x as usize >= width {
        return None;
    }
    let pixel_offset = (y as usize).checked_mul(width)?.checked_add(x as usize)?;
    let byte_offset = pixel_offset.checked_mul(4)?;
    let end = byte_offset.checked_add(4)?;
    (end <= frame_len).then_some(byte_offset..end)
}

fn clip(rect: ScreenRectPx, viewport: Viewport) -> ScreenRectPx {
    ScreenRectPx {
        left: rect.left.max(0),
        top: rect.top.max(0),
        right: rect.right.min(viewport.width as i32),
        bottom: rect.bottom.min(viewport.height as i32),
    }
}

fn fill_rect_clipped(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    let clipped = clip(rect, viewport);
    for y in clipped.top..clipped.bottom {
        for x in clipped.left..clipped.right {
            write_pixel_rgba_clipped(frame, viewport.width as usize, x, y, color);
        }
    }
}

fn blend_rect_clipped(
    frame: &mut [u8],
    viewport: Viewport,
    rect: ScreenRectPx,
    rgb: [u8; 3],
    alpha: u8,
) {
    let clipped = clip(rect, viewport);
    for y in clipped.top..clipped.bottom {
        for x in clipped.left..clipped.right {
            blend_pixel_clipped(frame, viewport.width as usize, x, y, rgb, alpha);
        }
    }
}

fn outline_rect_clipped(frame: &mut [u8], viewport: Viewport, rect: ScreenRectPx, color: [u8; 4]) {
    if rect.right <= rect.left || rect.bottom <= rect.top {
        return;
    }
    let width = viewport.width as usize;
    for x in rect.left..rect.right {
        write_pixel_rgba_clipped(frame, width, x, rect.top, color);
        write_pixel_rgba_clipped(frame, width, x, rect.bottom - 1, color);
    }
    for y in rect.top..rect.bottom {
        write_pixel_rgba_clipped(frame, width, rect.left, y, color);
        write_pixel_rgba_clipped(frame, width, rect.right - 1, y, color);
    }
}
