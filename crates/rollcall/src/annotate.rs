//! Draw recognition boxes and the registration guide onto a frame.

use crate::controller::Mode;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rollcall_core::Recognition;

const KNOWN: Rgb<u8> = Rgb([0, 255, 0]);
const UNKNOWN: Rgb<u8> = Rgb([255, 0, 0]);
const GUIDE: Rgb<u8> = Rgb([255, 255, 255]);

const BOX_THICKNESS: i32 = 2;
const LABEL_BAR_HEIGHT: i32 = 30;
const GUIDE_HALF_WIDTH: i32 = 100;
const GUIDE_HALF_HEIGHT: i32 = 120;

/// Annotate `canvas` for the given mode. Idle frames are left untouched.
pub fn draw(canvas: &mut RgbImage, mode: &Mode, recognitions: &[Recognition]) {
    match mode {
        Mode::Recognizing => {
            for r in recognitions {
                let color = if r.is_known() { KNOWN } else { UNKNOWN };
                let left = r.bbox.x.round() as i32;
                let top = r.bbox.y.round() as i32;
                let width = r.bbox.width.round() as i32;
                let height = r.bbox.height.round() as i32;

                for inset in 0..BOX_THICKNESS {
                    let inner = rect(
                        left + inset,
                        top + inset,
                        width - 2 * inset,
                        height - 2 * inset,
                    );
                    if let Some(rect) = inner {
                        draw_hollow_rect_mut(canvas, rect, color);
                    }
                }
                let bar = LABEL_BAR_HEIGHT.min(height);
                if let Some(rect) = rect(left, top + height - bar, width, bar) {
                    draw_filled_rect_mut(canvas, rect, color);
                }
            }
        }
        Mode::Registering { .. } => {
            let cx = canvas.width() as i32 / 2;
            let cy = canvas.height() as i32 / 2;
            if let Some(rect) = rect(
                cx - GUIDE_HALF_WIDTH,
                cy - GUIDE_HALF_HEIGHT,
                2 * GUIDE_HALF_WIDTH,
                2 * GUIDE_HALF_HEIGHT,
            ) {
                draw_hollow_rect_mut(canvas, rect, GUIDE);
            }
        }
        Mode::Idle => {}
    }
}

/// `None` for degenerate boxes.
fn rect(left: i32, top: i32, width: i32, height: i32) -> Option<Rect> {
    (width > 0 && height > 0).then(|| Rect::at(left, top).of_size(width as u32, height as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::{BoundingBox, Identity};

    fn recognition(known: bool, x: f32, y: f32, w: f32, h: f32) -> Recognition {
        Recognition {
            bbox: BoundingBox {
                x,
                y,
                width: w,
                height: h,
                confidence: 0.9,
                landmarks: None,
            },
            identity: known.then(|| Identity::from_stem("1001_Steve")),
            distance: Some(0.1),
        }
    }

    #[test]
    fn test_known_face_green_with_label_bar() {
        let mut canvas = RgbImage::new(200, 200);
        draw(&mut canvas, &Mode::Recognizing, &[recognition(true, 20.0, 20.0, 100.0, 100.0)]);

        assert_eq!(*canvas.get_pixel(20, 50), KNOWN); // left edge
        assert_eq!(*canvas.get_pixel(60, 110), KNOWN); // label bar
        assert_eq!(*canvas.get_pixel(60, 50), Rgb([0, 0, 0])); // interior above bar
        assert_eq!(*canvas.get_pixel(150, 150), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_unknown_face_red() {
        let mut canvas = RgbImage::new(100, 100);
        draw(&mut canvas, &Mode::Recognizing, &[recognition(false, 10.0, 10.0, 50.0, 50.0)]);
        assert_eq!(*canvas.get_pixel(10, 10), UNKNOWN);
    }

    #[test]
    fn test_boxes_are_clipped() {
        let mut canvas = RgbImage::new(50, 50);
        draw(&mut canvas, &Mode::Recognizing, &[recognition(true, -20.0, 30.0, 100.0, 100.0)]);
        assert_eq!(*canvas.get_pixel(49, 30), KNOWN);
    }

    #[test]
    fn test_registration_guide_centred() {
        let mut canvas = RgbImage::new(640, 480);
        let mode = Mode::Registering {
            user_id: "1".into(),
            name: "A".into(),
        };
        draw(&mut canvas, &mode, &[]);
        assert_eq!(*canvas.get_pixel(220, 120), GUIDE);
        assert_eq!(*canvas.get_pixel(320, 240), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let mut canvas = RgbImage::new(10, 10);
        draw(&mut canvas, &Mode::Recognizing, &[recognition(true, 2.0, 2.0, 0.0, 4.0)]);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_idle_leaves_frame_untouched() {
        let mut canvas = RgbImage::new(10, 10);
        draw(&mut canvas, &Mode::Idle, &[recognition(true, 0.0, 0.0, 5.0, 5.0)]);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
