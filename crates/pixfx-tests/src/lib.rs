//! End-to-end tests for pixfx crates.
//!
//! Exercises the public surface of `pixfx-core` and `pixfx-ops` together:
//! full pipelines over packed buffers, merge laws, LUT accuracy and the
//! serialized form of configuration types.
//!
//! Set `RUST_LOG=pixfx_ops=trace` to see pass-level logging while the tests
//! run.

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::init_tracing;
    use approx::assert_abs_diff_eq;
    use pixfx_core::color::{hsl_to_rgb, hsv_to_rgb, rgb_to_hsl, rgb_to_hsv};
    use pixfx_core::{Parallelism, Pixel, PixelBuffer, PixelLayout, PixelSource, Rect};
    use pixfx_ops::channel::ChannelFilter;
    use pixfx_ops::lut::Lut;
    use pixfx_ops::resize::Contributions;
    use pixfx_ops::{
        CustomKernel, Filter, FilterList, Interpolation, ResampleKernel, ScaleMode, Transformer, brightness, contrast,
        crop_rect, gamma, grayscale, hsl, invert, resize, rotate, rotate90, scale_additive, transform,
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::FRAC_PI_2;

    const MID_GRAY: Pixel = Pixel::new(0.5, 0.5, 0.5, 1.0);

    fn run(filters: impl IntoIterator<Item = Filter>, src: &PixelBuffer) -> PixelBuffer {
        let list: FilterList = filters.into_iter().collect();
        let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, list.bounds(src.bounds()));
        list.apply(&mut dst, src, Parallelism::Auto);
        dst
    }

    /// Runs each filter as its own list, so nothing merges.
    fn run_unmerged(filters: &[Filter], src: &PixelBuffer) -> PixelBuffer {
        filters.iter().fold(src.clone(), |img, f| run([f.clone()], &img))
    }

    fn assert_same(a: &PixelBuffer, b: &PixelBuffer, eps: f32) {
        assert_eq!(a.bounds(), b.bounds());
        for (pa, pb) in a.to_pixels().into_iter().zip(b.to_pixels()) {
            assert!(pa.max_diff(pb) <= eps, "{pa:?} vs {pb:?}");
        }
    }

    fn random_image(rng: &mut StdRng, width: u32, height: u32) -> PixelBuffer {
        let data: Vec<u8> = (0..width * height * 4).map(|_| rng.r#gen::<u8>()).collect();
        match PixelBuffer::from_u8(PixelLayout::Nrgba8, Rect::from_size(width, height), data) {
            Ok(buf) => buf,
            Err(e) => panic!("random image: {e}"),
        }
    }

    fn assert_solid(img: &PixelBuffer, expected: Pixel, eps: f32) {
        for p in img.to_pixels() {
            assert!(p.max_diff(expected) <= eps, "{p:?} != {expected:?}");
        }
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    #[test]
    fn test_mid_gray_scenarios() {
        init_tracing();
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(4, 4), MID_GRAY);

        assert_solid(&run([grayscale()], &src), MID_GRAY, 1e-5);
        assert_solid(&run([invert()], &src), MID_GRAY, 1e-6);
        assert_solid(&run(brightness(100.0), &src), Pixel::WHITE, 1e-6);

        let ramp = PixelBuffer::from_fn(PixelLayout::RgbaF32, Rect::from_size(4, 4), |x, y| {
            Pixel::gray((x + 4 * y) as f32 / 15.0)
        });
        assert_solid(&run(contrast(-100.0), &ramp), MID_GRAY, 1e-6);
    }

    #[test]
    fn test_mid_gray_packed_layouts() {
        for layout in [PixelLayout::Rgba8, PixelLayout::Nrgba16, PixelLayout::Gray8] {
            let src = PixelBuffer::filled(layout, Rect::from_size(4, 4), MID_GRAY);
            let expected = src.pixel(0, 0);
            assert_solid(&run([grayscale()], &src), expected, 1e-5);
            assert_solid(&run(brightness(100.0), &src), Pixel::WHITE, 1e-6);
        }
    }

    #[test]
    fn test_box_upscale_blocks() {
        let colors = [
            Pixel::new(1.0, 0.0, 0.0, 1.0),
            Pixel::new(0.0, 1.0, 0.0, 1.0),
            Pixel::new(0.0, 0.0, 1.0, 1.0),
            Pixel::new(1.0, 1.0, 0.0, 1.0),
        ];
        let src = PixelBuffer::from_fn(PixelLayout::Rgba8, Rect::from_size(2, 2), |x, y| {
            colors[(x + 2 * y) as usize]
        });
        let dst = run([resize(4, 4, ResampleKernel::Box)], &src);
        assert_eq!(dst.bounds().size(), (4, 4));
        for y in 0..4 {
            for x in 0..4 {
                let expected = colors[(x / 2 + 2 * (y / 2)) as usize];
                assert!(dst.pixel(x, y).max_diff(expected) < 1e-6, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_crop_and_rotate_bounds() {
        let list: FilterList = crop_rect(0.0, 0.0, 0.5, 0.5).into_iter().collect();
        assert_eq!(list.bounds(Rect::from_size(100, 100)).size(), (50, 50));

        let list: FilterList = [rotate90()].into_iter().collect();
        assert_eq!(list.bounds(Rect::from_size(60, 100)).size(), (100, 60));

        let list: FilterList = rotate(FRAC_PI_2, Interpolation::Bicubic).into_iter().collect();
        assert_eq!(list.bounds(Rect::from_size(60, 100)).size(), (100, 60));
    }

    // ========================================================================
    // Merge laws
    // ========================================================================

    #[test]
    fn test_merge_matches_sequence() {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(7);
        let src = random_image(&mut rng, 32, 32);

        let cases: Vec<(&str, Vec<Filter>, f32)> = vec![
            ("invert", vec![invert(), invert(), invert()], 1e-6),
            (
                "hue",
                vec![hsl(40.0, 0.0, 0.0).unwrap(), hsl(100.0, 0.0, 0.0).unwrap()],
                1e-3,
            ),
            (
                "dihedral",
                vec![
                    transform(Transformer::Transpose).unwrap(),
                    transform(Transformer::Rotate90).unwrap(),
                    transform(Transformer::FlipH).unwrap(),
                ],
                0.0,
            ),
            (
                "rotate",
                vec![
                    rotate(FRAC_PI_2, Interpolation::Bilinear).unwrap(),
                    rotate(FRAC_PI_2, Interpolation::Bilinear).unwrap(),
                    rotate90(),
                ],
                0.0,
            ),
            (
                "crop",
                vec![crop_rect(0.25, 0.25, 0.5, 0.5).unwrap(), crop_rect(0.5, 0.5, 0.5, 0.5).unwrap()],
                0.0,
            ),
            ("gamma", vec![gamma(2.0).unwrap(), gamma(2.0).unwrap()], 1e-5),
        ];

        for (name, filters, eps) in cases {
            let merged: FilterList = filters.iter().cloned().collect();
            assert!(merged.len() <= 1, "{name} did not fold");
            let folded = run(filters.iter().cloned(), &src);
            let sequential = run_unmerged(&filters, &src);
            assert_eq!(folded.bounds().size(), sequential.bounds().size(), "{name}");
            for (a, b) in folded.to_pixels().into_iter().zip(sequential.to_pixels()) {
                assert!(a.max_diff(b) <= eps, "{name}: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_gamma_merge_adds_exponents() {
        // gamma values add on merge; 2 + 2 happens to equal 2 * 2
        let merged = gamma(2.0).unwrap().merge(&gamma(2.0).unwrap()).unwrap();
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(2, 2), Pixel::gray(0.0625));
        assert_solid(&run([merged], &src), Pixel::gray(0.5), 1e-5);

        let merged = gamma(2.0).unwrap().merge(&gamma(3.0).unwrap()).unwrap();
        let out = run([merged], &src).pixel(0, 0).r;
        assert_abs_diff_eq!(out, 0.0625f32.powf(1.0 / 5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_brightness_contrast_param_sum() {
        let mut rng = StdRng::seed_from_u64(11);
        let src = random_image(&mut rng, 16, 16);

        let merged = run([brightness(20.0).unwrap(), brightness(35.0).unwrap()], &src);
        assert_same(&merged, &run(brightness(55.0), &src), 1e-6);

        let merged = run([contrast(-10.0).unwrap(), contrast(40.0).unwrap()], &src);
        assert_same(&merged, &run(contrast(30.0), &src), 1e-6);
    }

    #[test]
    fn test_merge_then_undo_restores() {
        let a = brightness(25.0).unwrap();
        let b = brightness(-60.0).unwrap();
        let back = a.clone().merge(&b).unwrap().undo(&b).unwrap().unwrap();
        let src = PixelBuffer::filled(PixelLayout::RgbaF32, Rect::from_size(2, 2), Pixel::gray(0.3));
        assert_same(&run([back], &src), &run([a], &src), 1e-6);

        let h = hsl(30.0, 10.0, -5.0).unwrap();
        let g = hsl(-80.0, 20.0, 5.0).unwrap();
        let back = h.clone().merge(&g).unwrap().undo(&g).unwrap().unwrap();
        assert_same(&run([back], &src), &run([h], &src), 1e-5);

        let mut list = FilterList::new();
        list.add(rotate90());
        list.add(transform(Transformer::FlipH));
        list.undo(&transform(Transformer::FlipH).unwrap());
        let t = list.iter().next().cloned();
        assert!(matches!(t, Some(Filter::Transform(ref f)) if f.transformer() == Transformer::Rotate90));
    }

    #[test]
    fn test_additive_scale_steps() {
        let step = |f: f32| scale_additive(f, f, ResampleKernel::Bilinear).unwrap();
        let src = PixelBuffer::filled(PixelLayout::Rgba8, Rect::from_size(8, 8), MID_GRAY);
        let mut list = FilterList::new();
        list.add(step(1.5));
        list.add(step(0.5));
        assert_eq!(list.len(), 1);
        assert_eq!(list.bounds(src.bounds()), Rect::from_size(16, 16));

        list.undo(&step(0.5));
        assert_eq!(list.bounds(src.bounds()), Rect::from_size(12, 12));
        let mut dst = PixelBuffer::new(PixelLayout::Rgba8, list.bounds(src.bounds()));
        list.apply(&mut dst, &src, Parallelism::Auto);
        assert!(dst.to_pixels().iter().all(|p| p.max_diff(MID_GRAY) < 1.0 / 255.0));

        list.add(step(-0.5));
        assert!(list.is_empty());
    }

    // ========================================================================
    // Numerics
    // ========================================================================

    #[test]
    fn test_hsl_hsv_roundtrip() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let (r, g, b) = (rng.r#gen::<f32>(), rng.r#gen::<f32>(), rng.r#gen::<f32>());
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r2, g2, b2) = hsl_to_rgb(h, s, l);
            assert_abs_diff_eq!(r, r2, epsilon = 1e-4);
            assert_abs_diff_eq!(g, g2, epsilon = 1e-4);
            assert_abs_diff_eq!(b, b2, epsilon = 1e-4);

            let (h, s, v) = rgb_to_hsv(r, g, b);
            let (r3, g3, b3) = hsv_to_rgb(h, s, v);
            assert_abs_diff_eq!(r, r3, epsilon = 1e-4);
            assert_abs_diff_eq!(g, g3, epsilon = 1e-4);
            assert_abs_diff_eq!(b, b3, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_lut_matches_direct() {
        let mut rng = StdRng::seed_from_u64(42);
        let curve = ChannelFilter::gamma(2.2).unwrap();

        let lut8 = Lut::build(256, |x| curve.eval(x));
        for _ in 0..100 {
            let x = rng.gen_range(0..=255u8) as f32 / 255.0;
            assert_abs_diff_eq!(lut8.lookup(x), curve.eval(x), epsilon = 1e-6);
        }

        let inv = ChannelFilter::invert();
        let lut16 = Lut::build(65536, |x| inv.eval(x));
        for _ in 0..100 {
            let x: f32 = rng.r#gen();
            assert!((lut16.lookup(x) - inv.eval(x)).abs() <= 1.0 / 65535.0);
        }
    }

    #[test]
    fn test_lut_path_matches_direct_path() {
        let mut rng = StdRng::seed_from_u64(5);
        // large enough for the table to pay off
        let src = random_image(&mut rng, 48, 48);
        let f = ChannelFilter::gamma(1.8).unwrap();
        let via_lut = run([Filter::Channel(f.clone())], &src);
        for (out, input) in via_lut.to_pixels().into_iter().zip(src.to_pixels()) {
            assert_abs_diff_eq!(out.r, f.eval(input.r), epsilon = 1e-5);
            assert_abs_diff_eq!(out.a, input.a, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_contribution_weights_sum_to_one() {
        for kernel in ResampleKernel::ALL {
            for (src, dst) in [(10, 3), (3, 10), (7, 7), (1, 5), (64, 1)] {
                let c = Contributions::new(src, dst, &kernel, 1.0);
                for taps in c.iter() {
                    let sum: f32 = taps.iter().map(|t| t.weight).sum();
                    assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let mut rng = StdRng::seed_from_u64(9);
        let src = random_image(&mut rng, 37, 23);
        let list: FilterList = [
            rotate(0.4, Interpolation::Bicubic).unwrap(),
            resize(20, 30, ResampleKernel::Lanczos3),
            invert(),
        ]
        .into_iter()
        .collect();
        let bounds = list.bounds(src.bounds());
        let outputs: Vec<PixelBuffer> = [Parallelism::Sequential, Parallelism::Workers(3), Parallelism::Auto]
            .into_iter()
            .map(|par| {
                let mut dst = PixelBuffer::new(PixelLayout::RgbaF32, bounds);
                list.apply(&mut dst, &src, par);
                dst
            })
            .collect();
        assert_same(&outputs[0], &outputs[1], 0.0);
        assert_same(&outputs[0], &outputs[2], 0.0);
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    #[test]
    fn test_config_types_serde() {
        for kernel in ResampleKernel::ALL {
            let json = serde_json::to_string(&kernel).unwrap();
            assert_eq!(serde_json::from_str::<ResampleKernel>(&json).unwrap(), kernel);
        }
        for t in Transformer::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(serde_json::from_str::<Transformer>(&json).unwrap(), t);
        }

        let custom = ResampleKernel::Custom(CustomKernel::new(|x: f32| 1.0 - x.abs(), 1.0));
        assert!(serde_json::to_string(&custom).is_err());
        let json = serde_json::to_string(&ScaleMode::Add).unwrap();
        assert_eq!(serde_json::from_str::<ScaleMode>(&json).unwrap(), ScaleMode::Add);

        let json = serde_json::to_string(&Interpolation::Bicubic).unwrap();
        assert_eq!(json, "\"Bicubic\"");

        let par: Parallelism = serde_json::from_str(r#"{"Workers":4}"#).unwrap();
        assert_eq!(par, Parallelism::Workers(4));

        let rect = Rect::new(3, 4, 10, 20);
        let back: Rect = serde_json::from_str(&serde_json::to_string(&rect).unwrap()).unwrap();
        assert_eq!(back, rect);

        let layout: PixelLayout = serde_json::from_str("\"Nrgba16\"").unwrap();
        assert_eq!(layout, PixelLayout::Nrgba16);
    }
}
