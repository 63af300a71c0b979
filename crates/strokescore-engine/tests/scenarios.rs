//! Integration tests: synthetic characters through the full analysis and
//! scoring path.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use strokescore_engine::config::AnalysisConfig;
use strokescore_engine::pressure::{PressureStatus, Problem};
use strokescore_engine::strokes::RelativePosition;
use strokescore_engine::{BinaryMask, EngineError, analyze_mask, compare, compare_analyses, compare_images};

fn in_rect(x: u32, y: u32, (x0, x1, y0, y1): (u32, u32, u32, u32)) -> bool {
    (x0..x1).contains(&x) && (y0..y1).contains(&y)
}

/// A single vertical 10×200 bar.
fn bar() -> BinaryMask {
    BinaryMask::from_fn(40, 240, |x, y| in_rect(x, y, (15, 25, 20, 220)))
}

/// A 10-pixel-wide L: down 40, then right 40.
fn l_shape() -> BinaryMask {
    BinaryMask::from_fn(60, 60, |x, y| {
        in_rect(x, y, (10, 20, 10, 50)) || in_rect(x, y, (10, 50, 40, 50))
    })
}

/// Four disjoint rectangles arranged like the frame of 中.
fn frame() -> BinaryMask {
    BinaryMask::from_fn(200, 200, |x, y| {
        in_rect(x, y, (20, 30, 40, 160))
            || in_rect(x, y, (50, 150, 40, 50))
            || in_rect(x, y, (170, 180, 40, 160))
            || in_rect(x, y, (50, 150, 150, 160))
    })
}

/// Two tall vertical bars flanking two horizontal bars, like the outer
/// strokes of 中 pulled apart. Ids in raster order: left bar, right bar,
/// top bar, bottom bar.
fn zhong() -> BinaryMask {
    BinaryMask::from_fn(200, 200, |x, y| {
        in_rect(x, y, (30, 40, 10, 190))
            || in_rect(x, y, (160, 170, 15, 185))
            || in_rect(x, y, (60, 140, 20, 30))
            || in_rect(x, y, (60, 140, 170, 180))
    })
}

fn gray_png(mask: &BinaryMask) -> Vec<u8> {
    let img = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.is_ink(x, y) { Luma([0]) } else { Luma([255]) }
    });
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::L8,
    )
    .unwrap();
    buf
}

fn rgb_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(
        encoder,
        img.as_raw(),
        img.width(),
        img.height(),
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

#[test]
fn vertical_bar_is_one_straight_uniform_stroke() {
    let analysis = analyze_mask(&bar(), &AnalysisConfig::default());

    assert_eq!(analysis.strokes.strokes.len(), 1);
    assert!(analysis.turning_points.is_empty());

    let path = &analysis.skeleton.paths()[0];
    let tangent = path.tangent_degrees(path.len() / 2, 5).unwrap();
    assert!((tangent - 90.0).abs() <= 2.0, "tangent {tangent}");

    let summary = analysis.thickness.overall.unwrap().summary;
    assert!((summary.mean - 10.0).abs() < 0.5, "{summary:?}");
    assert!(summary.std_of_variation < 0.05, "{summary:?}");
}

#[test]
fn l_shape_has_one_right_angle_turn_near_the_corner() {
    let analysis = analyze_mask(&l_shape(), &AnalysisConfig::default());
    assert_eq!(analysis.turning_points.len(), 1, "{:?}", analysis.turning_points);
    let turn = analysis.turning_points[0];
    assert!((70.0..=110.0).contains(&turn.angle_degrees));
    assert!(turn.position.x.abs_diff(14) <= 4, "{:?}", turn.position);
    assert!(turn.position.y.abs_diff(44) <= 4, "{:?}", turn.position);
}

#[test]
fn frame_has_four_strokes_and_six_classified_spacings() {
    let analysis = analyze_mask(&frame(), &AnalysisConfig::default());
    let layout = &analysis.strokes;
    assert_eq!(layout.strokes.len(), 4);
    assert_eq!(layout.pairs.len(), 6);

    let relation = |a: usize, b: usize| {
        layout
            .pairs
            .iter()
            .find(|p| p.first == a && p.second == b)
            .unwrap()
            .relative_position
    };
    // 0 left, 1 top, 2 right, 3 bottom.
    assert_eq!(relation(0, 2), RelativePosition::Horizontal);
    assert_eq!(relation(1, 3), RelativePosition::Vertical);
    assert_eq!(relation(2, 3), RelativePosition::HorizontalReversed);
}

#[test]
fn vertical_bars_sit_above_and_below_the_horizontal_bars() {
    use RelativePosition::{Horizontal, Vertical, VerticalReversed};

    let layout = analyze_mask(&zhong(), &AnalysisConfig::default()).strokes;
    assert_eq!(layout.strokes.len(), 4);
    let orientations: Vec<f64> = layout
        .strokes
        .iter()
        .map(|s| s.orientation_degrees.unwrap())
        .collect();
    assert!((orientations[0] - 90.0).abs() < 1e-6);
    assert!((orientations[1] - 90.0).abs() < 1e-6);
    assert!(orientations[2].abs() < 1e-6);
    assert!(orientations[3].abs() < 1e-6);

    let got: Vec<(usize, usize, RelativePosition)> = layout
        .pairs
        .iter()
        .map(|p| (p.first, p.second, p.relative_position))
        .collect();
    assert_eq!(
        got,
        vec![
            (0, 1, Horizontal),
            (0, 2, VerticalReversed),
            (0, 3, Vertical),
            (1, 2, VerticalReversed),
            (1, 3, Vertical),
            (2, 3, Vertical),
        ]
    );
}

#[test]
fn comparing_a_mask_with_itself_is_perfect() {
    for mask in [bar(), l_shape(), frame()] {
        let cmp = compare(&mask, &mask, &AnalysisConfig::default()).unwrap();
        assert!((cmp.scores.thickness - 100.0).abs() < 1e-9);
        assert!((cmp.scores.turning - 100.0).abs() < 1e-9);
        assert!((cmp.scores.spacing - 100.0).abs() < 1e-9);
        assert!(cmp.scores.composite >= 99.0, "{:?}", cmp.scores);
        assert_eq!(cmp.scores.grade, strokescore_engine::Grade::A);
    }
}

#[test]
fn blank_masks_compare_without_error() {
    let blank = BinaryMask::new(64, 64);
    let analysis = analyze_mask(&blank, &AnalysisConfig::default());
    assert!(analysis.skeleton.is_empty());
    assert!(analysis.turning_points.is_empty());
    assert!(analysis.thickness.overall.is_none());

    let cmp = compare(&blank, &blank, &AnalysisConfig::default()).unwrap();
    assert!(cmp.scores.composite >= 99.0);
}

#[test]
fn analysis_is_deterministic() {
    let config = AnalysisConfig::default();
    for mask in [l_shape(), frame()] {
        assert_eq!(analyze_mask(&mask, &config), analyze_mask(&mask, &config));
    }
}

#[test]
fn thickness_never_exceeds_twice_the_smaller_side() {
    let mask = BinaryMask::from_fn(30, 80, |x, y| in_rect(x, y, (0, 30, 0, 80)));
    let analysis = analyze_mask(&mask, &AnalysisConfig::default());
    for point in analysis.skeleton.ordered_points() {
        let t = analysis.distance_field.thickness_at(point);
        assert!((0.0..=60.0).contains(&t), "{t} at {point:?}");
    }
}

#[test]
fn difference_scores_are_symmetric() {
    let config = AnalysisConfig::default();
    let thin = BinaryMask::from_fn(60, 60, |x, y| in_rect(x, y, (12, 18, 10, 50)));
    let forward = compare(&l_shape(), &thin, &config).unwrap();
    let backward = compare(&thin, &l_shape(), &config).unwrap();
    assert!((forward.scores.thickness - backward.scores.thickness).abs() < 1e-9);
    assert!((forward.scores.turning - backward.scores.turning).abs() < 1e-9);
    assert!((forward.scores.overlap - backward.scores.overlap).abs() < 1e-9);
    assert!(forward.scores.composite < 99.0);
}

#[test]
fn images_round_trip_through_decoding() {
    let bytes = gray_png(&frame());
    let cmp = compare_images(&bytes, &bytes, &AnalysisConfig::default()).unwrap();
    assert_eq!(cmp.user.strokes.strokes.len(), 4);
    assert!(cmp.scores.composite >= 99.0);
}

#[test]
fn red_guide_lines_are_not_ink() {
    let img = RgbImage::from_fn(100, 100, |x, y| {
        if in_rect(x, y, (40, 50, 10, 90)) {
            Rgb([0, 0, 0])
        } else if x == 5 || y == 5 || x == 94 || y == 94 {
            Rgb([230, 20, 20])
        } else {
            Rgb([255, 255, 255])
        }
    });
    let bytes = rgb_png(&img);
    let expected = BinaryMask::from_fn(100, 100, |x, y| in_rect(x, y, (40, 50, 10, 90)));

    let mask = strokescore_engine::mask::decode_mask(&bytes, &AnalysisConfig::default().mask).unwrap();
    assert_eq!(mask, expected);

    let analysis = analyze_mask(&mask, &AnalysisConfig::default());
    assert_eq!(analysis.strokes.strokes.len(), 1);
}

#[test]
fn unusable_bytes_are_errors() {
    let good = gray_png(&bar());
    assert!(matches!(
        compare_images(&[], &good, &AnalysisConfig::default()),
        Err(EngineError::EmptyInput)
    ));
    assert!(matches!(
        compare_images(b"not an image", &good, &AnalysisConfig::default()),
        Err(EngineError::ImageDecode(_))
    ));
}

#[test]
fn mismatched_images_are_rejected() {
    let a = gray_png(&bar());
    let b = gray_png(&l_shape());
    let err = compare_images(&a, &b, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, EngineError::DimensionMismatch { .. }));
}

#[test]
fn analyses_can_run_on_separate_threads() {
    let config = AnalysisConfig::default();
    let (reference, user) = (frame(), frame());

    let (ref_analysis, user_analysis) = std::thread::scope(|s| {
        let r = s.spawn(|| analyze_mask(&reference, &config));
        let u = s.spawn(|| analyze_mask(&user, &config));
        (r.join().unwrap(), u.join().unwrap())
    });

    let threaded = compare_analyses(&reference, &user, ref_analysis, user_analysis, &config);
    let sequential = compare(&reference, &user, &config).unwrap();
    assert_eq!(threaded, sequential);
}

#[test]
fn results_serialize_to_json() {
    let cmp = compare(&l_shape(), &l_shape(), &AnalysisConfig::default()).unwrap();
    let json = serde_json::to_string(&cmp.scores).unwrap();
    assert!(json.contains("\"grade\":\"A\""));

    let turn = serde_json::to_value(cmp.user.turning_points[0]).unwrap();
    assert!(turn.get("angle_degrees").is_some());
    assert!(turn.get("estimated_pressure").is_some());
}

#[test]
fn heavier_lower_half_is_the_worst_problem_area() {
    let reference = bar();
    // Same bar, twice as wide below y = 120.
    let user = BinaryMask::from_fn(40, 240, |x, y| {
        in_rect(x, y, (15, 25, 20, 120)) || in_rect(x, y, (10, 30, 120, 220))
    });
    let cmp = compare(&reference, &user, &AnalysisConfig::default()).unwrap();

    assert!(!cmp.problem_areas.is_empty());
    assert!(
        cmp.problem_areas
            .windows(2)
            .all(|w| w[0].severity >= w[1].severity)
    );
    let worst = cmp.problem_areas[0];
    assert_eq!(worst.problem, Problem::Pressure(PressureStatus::TooHeavy));
    assert!(worst.position.y >= 120);
    assert!(cmp.pressure.tally.too_heavy > 0);
    assert!(cmp.pressure.tally.good > 0);
}

#[test]
fn stroke_order_reads_top_down() {
    let analysis = analyze_mask(&zhong(), &AnalysisConfig::default());
    let order = &analysis.dynamics.stroke_order;
    assert_eq!(order.len(), analysis.skeleton.paths().len());
    let start = |i: usize| analysis.skeleton.paths()[i].points[0];

    // The left bar starts highest; the bottom bar starts far below the rest.
    let first = start(order[0]);
    assert!(first.x < 50 && first.y < 20, "{first:?}");
    let last = start(*order.last().unwrap());
    assert!(last.y > 150, "{last:?}");
}
