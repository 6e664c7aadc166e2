use super::*;

fn checker(w: u32, h: u32) -> Raster {
    let mut r = Raster::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let c = if (x + y) % 2 == 0 {
                Rgba8::rgb(255, 0, 0)
            } else {
                Rgba8::rgb(0, 0, 255)
            };
            r.fill_rect(x as i32, y as i32, 1, 1, c);
        }
    }
    r
}

#[test]
fn nearest_upscale_duplicates_pixels_without_blending() {
    let src = checker(2, 2);
    let up = src.scale_nearest(4, 4);
    let colors: std::collections::BTreeSet<[u8; 4]> = up
        .data
        .chunks_exact(4)
        .map(|p| [p[0], p[1], p[2], p[3]])
        .collect();
    assert_eq!(colors.len(), 2, "no intermediate colors allowed");
    assert_eq!(up.pixel(0, 0), up.pixel(1, 1));
    assert_eq!(up.pixel(0, 0), src.pixel(0, 0));
    assert_eq!(up.pixel(2, 0), src.pixel(1, 0));
    assert_eq!(up.pixel(3, 3), src.pixel(1, 1));
}

#[test]
fn draw_over_clips_and_blends() {
    let mut dst = Raster::filled(4, 4, Rgba8::rgb(0, 0, 0));
    let src = Raster::filled(2, 2, Rgba8::rgb(255, 255, 255));
    dst.draw_over(&src, 3, -1);
    assert_eq!(dst.pixel(3, 0), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(2, 0), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(3, 1), [0, 0, 0, 255]);

    let half = Raster::filled(1, 1, Rgba8::rgba(255, 255, 255, 128));
    dst.draw_over(&half, 0, 0);
    assert_eq!(dst.pixel(0, 0), [128, 128, 128, 255]);

    dst.draw_over(&src, 10, 10);
    dst.draw_over(&src, -10, -10);
}

#[test]
fn mirror_flips_columns() {
    let mut r = Raster::new(3, 1);
    r.fill_rect(0, 0, 1, 1, Rgba8::rgb(255, 0, 0));
    let m = r.mirrored();
    assert_eq!(m.pixel(2, 0), [255, 0, 0, 255]);
    assert_eq!(m.pixel(0, 0), [0, 0, 0, 0]);
}

#[test]
fn viewport_offset_shifts_and_clamps() {
    let mut layer = Raster::new(4, 1);
    for x in 0..4 {
        layer.fill_rect(x, 0, 1, 1, Rgba8::rgb((x * 60) as u8, 0, 0));
    }
    let shifted = layer.sample_viewport(4, 1, Vec2::new(1.0, 0.0), 1.0);
    assert_eq!(shifted.pixel(0, 0), layer.pixel(1, 0));
    assert_eq!(shifted.pixel(2, 0), layer.pixel(3, 0));
    assert_eq!(shifted.pixel(3, 0), layer.pixel(3, 0));

    let same = layer.sample_viewport(4, 1, Vec2::ZERO, 1.0);
    assert_eq!(same, layer);
}

#[test]
fn viewport_zoom_magnifies_about_centre() {
    let layer = checker(4, 4);
    let z = layer.sample_viewport(4, 4, Vec2::ZERO, 2.0);
    // With 2x zoom the centre 2x2 block fills the viewport.
    assert_eq!(z.pixel(0, 0), layer.pixel(1, 1));
    assert_eq!(z.pixel(3, 3), layer.pixel(2, 2));
    assert_eq!(z.pixel(1, 1), layer.pixel(1, 1));
}

#[test]
fn flatten_over_background() {
    let r = Raster::new(1, 1);
    let mut out = vec![0u8; 4];
    r.flatten_to_opaque(&mut out, Rgba8::rgb(10, 20, 30)).unwrap();
    assert_eq!(out, vec![10, 20, 30, 255]);

    let opaque = Raster::filled(1, 1, Rgba8::rgb(1, 2, 3));
    opaque.flatten_to_opaque(&mut out, Rgba8::rgb(10, 20, 30)).unwrap();
    assert_eq!(out, vec![1, 2, 3, 255]);
}

#[test]
fn image_roundtrip_keeps_opaque_pixels() {
    let r = checker(3, 2);
    let img = r.to_rgba_image().unwrap();
    assert_eq!(Raster::from_rgba_image(img), r);
}
