//! Integration Tests
//!
//! End-to-end tests for the BitRot decay pipeline.

use bitrot::engine::{DecayConfig, DecayEngine, PixelBuffer};
use bitrot::stages::{
    BitGlitcher, ChromaDecayer, Clamper, DecayRng, DecayStage, GrainInjector, WorkBuffer,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use test_case::test_case;
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test harness (RUST_LOG=bitrot=debug to see them)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Colorful mid-tone test image, away from the clamp limits
fn create_test_image(width: usize, height: usize, channels: usize) -> PixelBuffer {
    let mut samples = Vec::with_capacity(width * height * channels);
    for y in 0..height {
        for x in 0..width {
            samples.push((40 + (x * 13 + y * 7) % 176) as u8);
            samples.push((40 + (x * 5 + y * 17) % 176) as u8);
            samples.push((40 + (x * 11 + y * 3) % 176) as u8);
            if channels == 4 {
                samples.push((x * 31 + y) as u8);
            }
        }
    }
    PixelBuffer::new(width, height, channels, samples).unwrap()
}

/// Run the stages by hand with one shared stream, mirroring the engine
fn run_stages_by_hand(buffer: &PixelBuffer, config: &DecayConfig, seed: u64) -> PixelBuffer {
    let mut work = WorkBuffer::from_pixels(buffer);
    let mut rng = DecayRng::seed_from_u64(seed);

    GrainInjector::new(config.grain_intensity)
        .process(&mut work, &mut rng)
        .unwrap();
    if config.chroma_active {
        ChromaDecayer::new(config.chroma_strength)
            .process(&mut work, &mut rng)
            .unwrap();
    }
    if config.glitch_active {
        BitGlitcher::new(config.glitch_strength)
            .process(&mut work, &mut rng)
            .unwrap();
    }
    Clamper::new().process(&mut work, &mut rng).unwrap();
    work.to_pixels().unwrap()
}

// === Concrete Scenarios ===

#[test]
fn test_full_decay_changes_gray_image() {
    init_tracing();
    let buffer = PixelBuffer::filled(4, 4, 3, 128).unwrap();

    let output = bitrot::decay(&buffer, 0.0, Some(0xB17_507)).unwrap();

    assert!(output.count_differences(&buffer).unwrap() > 0);
    assert!(output.same_shape(&buffer));
}

#[test]
fn test_light_decay_keeps_alpha() {
    init_tracing();
    let buffer = create_test_image(2, 2, 4);

    let output = DecayEngine::new()
        .decay_detailed(&buffer, 0.9, Some(77))
        .unwrap();

    assert!(output.stage_applied("grain"));
    assert!(!output.stage_applied("chroma"));
    assert!(!output.stage_applied("glitch"));
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(
                output.buffer.pixel(x, y).unwrap()[3],
                buffer.pixel(x, y).unwrap()[3]
            );
        }
    }
}

// === Identity ===

#[test_case(3 ; "rgb")]
#[test_case(4 ; "rgba")]
fn test_full_integrity_is_identity(channels: usize) {
    let buffer = create_test_image(7, 5, channels);
    for seed in [None, Some(0), Some(u64::MAX)] {
        assert_eq!(bitrot::decay(&buffer, 1.0, seed).unwrap(), buffer);
    }
    // Clamped down to 1.0
    assert_eq!(bitrot::decay(&buffer, 12.0, Some(1)).unwrap(), buffer);
}

// === Activation Thresholds ===

#[test_case(0.99, true, false, false ; "just below full")]
#[test_case(0.8, true, false, false ; "chroma threshold")]
#[test_case(0.79, true, true, false ; "just below chroma threshold")]
#[test_case(0.5, true, true, false ; "glitch threshold")]
#[test_case(0.49, true, true, true ; "just below glitch threshold")]
#[test_case(0.0, true, true, true ; "destroyed")]
fn test_activation_thresholds(integrity: f32, grain: bool, chroma: bool, glitch: bool) {
    let output = DecayEngine::new()
        .decay_detailed(&create_test_image(8, 8, 3), integrity, Some(3))
        .unwrap();

    assert_eq!(output.stage_applied("grain"), grain);
    assert_eq!(output.stage_applied("chroma"), chroma);
    assert_eq!(output.stage_applied("glitch"), glitch);
    assert!(output.stage_applied("clamp"));
}

#[test_case(0.9 ; "grain only")]
#[test_case(0.65 ; "grain and chroma")]
#[test_case(0.3 ; "all stages")]
#[test_case(0.0 ; "maximum decay")]
fn test_engine_matches_manual_stage_order(integrity: f32) {
    let buffer = create_test_image(16, 12, 3);
    let config = DecayConfig::from_integrity(integrity).unwrap();

    let expected = run_stages_by_hand(&buffer, &config, 1234);
    let actual = bitrot::decay(&buffer, integrity, Some(1234)).unwrap();

    assert_eq!(actual, expected);
}

#[test]
fn test_chroma_band_leaves_chroma_out() {
    // In [0.8, 1.0) output is exactly grain + clamp
    let buffer = create_test_image(10, 10, 3);
    let config = DecayConfig::from_integrity(0.85).unwrap();

    let mut work = WorkBuffer::from_pixels(&buffer);
    let mut rng = DecayRng::seed_from_u64(9);
    GrainInjector::new(config.grain_intensity)
        .process(&mut work, &mut rng)
        .unwrap();
    Clamper::new().process(&mut work, &mut rng).unwrap();

    assert_eq!(
        bitrot::decay(&buffer, 0.85, Some(9)).unwrap(),
        work.to_pixels().unwrap()
    );
}

// === Determinism ===

#[test]
fn test_same_seed_same_output() {
    let buffer = create_test_image(24, 24, 4);
    let engine = DecayEngine::new();
    let a = engine.decay(&buffer, 0.2, Some(42)).unwrap();
    let b = engine.decay(&buffer, 0.2, Some(42)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_differ() {
    let buffer = create_test_image(24, 24, 3);
    let engine = DecayEngine::new();
    let a = engine.decay(&buffer, 0.2, Some(1)).unwrap();
    let b = engine.decay(&buffer, 0.2, Some(2)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_input_not_mutated() {
    let buffer = create_test_image(6, 6, 3);
    let snapshot = buffer.clone();
    let _ = bitrot::decay(&buffer, 0.0, Some(5)).unwrap();
    assert_eq!(buffer, snapshot);
}

// === Monotonicity ===

#[test]
fn test_deviation_grows_as_integrity_falls() {
    init_tracing();
    let buffer = create_test_image(32, 32, 3);
    let engine = DecayEngine::new();
    let levels = [1.0_f32, 0.9, 0.75, 0.6, 0.45, 0.3, 0.15, 0.0];

    let mut previous = -1.0_f64;
    for integrity in levels {
        let mean_mse: f64 = (0..8u64)
            .map(|seed| {
                let output = engine.decay(&buffer, integrity, Some(seed)).unwrap();
                output.mean_squared_error(&buffer).unwrap()
            })
            .sum::<f64>()
            / 8.0;

        assert!(
            mean_mse >= previous,
            "deviation fell at integrity {}: {:.2} < {:.2}",
            integrity,
            mean_mse,
            previous
        );
        previous = mean_mse;
    }
    approx::assert_relative_eq!(
        engine
            .decay(&buffer, 1.0, Some(0))
            .unwrap()
            .mean_squared_error(&buffer)
            .unwrap(),
        0.0
    );
}

// === Bounds Safety ===

#[test_case(1, 1 ; "single pixel")]
#[test_case(1, 31 ; "single column")]
#[test_case(31, 1 ; "single row")]
#[test_case(3, 7 ; "odd dimensions")]
#[test_case(2, 2 ; "tiny square")]
fn test_degenerate_shapes(width: usize, height: usize) {
    let engine = DecayEngine::new();
    for channels in [3, 4] {
        let buffer = create_test_image(width, height, channels);
        for seed in 0..32 {
            let output = engine.decay(&buffer, 0.0, Some(seed)).unwrap();
            assert_eq!(output.width(), width);
            assert_eq!(output.height(), height);
            assert_eq!(output.channels(), channels);
        }
    }
}

#[test_case(0, 5, 3 ; "zero width rgb")]
#[test_case(5, 0, 3 ; "zero height rgb")]
#[test_case(0, 5, 4 ; "zero width rgba")]
#[test_case(5, 0, 4 ; "zero height rgba")]
fn test_zero_area_shapes(width: usize, height: usize, channels: usize) {
    let buffer = PixelBuffer::new(width, height, channels, vec![]).unwrap();
    let engine = DecayEngine::new();

    for integrity in [1.0_f32, 0.0] {
        let output = engine.decay(&buffer, integrity, Some(11)).unwrap();
        assert!(output.same_shape(&buffer));
        assert!(output.is_empty());
    }

    let raw = engine
        .decay_samples(width, height, channels, vec![], 1.0, Some(1))
        .unwrap();
    assert!(raw.is_empty());
}

// === Raw Samples and Batches ===

#[test]
fn test_decay_samples_boundary() {
    let buffer = create_test_image(5, 4, 3);
    let engine = DecayEngine::new();

    let raw = engine
        .decay_samples(5, 4, 3, buffer.samples().to_vec(), 0.4, Some(10))
        .unwrap();
    let expected = engine.decay(&buffer, 0.4, Some(10)).unwrap();
    assert_eq!(raw, expected.into_samples());

    let err = engine
        .decay_samples(5, 4, 3, vec![0; 59], 0.4, Some(10))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_BUFFER");
}

#[test]
fn test_batch_is_reproducible_and_ordered() {
    init_tracing();
    let buffers: Vec<PixelBuffer> = (1..=6)
        .map(|n| create_test_image(4 + n, 3 + n, if n % 2 == 0 { 4 } else { 3 }))
        .collect();
    let engine = DecayEngine::new();

    let first = engine.decay_batch(&buffers, 0.35, Some(99)).unwrap();
    let second = engine.decay_batch(&buffers, 0.35, Some(99)).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), buffers.len());
    for (index, (input, output)) in buffers.iter().zip(&first).enumerate() {
        assert!(input.same_shape(output));
        let seed = bitrot::engine::splitmix64(99u64.wrapping_add(index as u64));
        assert_eq!(output, &engine.decay(input, 0.35, Some(seed)).unwrap());
    }
}

#[test]
fn test_batch_rejects_nan() {
    let buffers = vec![create_test_image(2, 2, 3)];
    let err = DecayEngine::new()
        .decay_batch(&buffers, f32::NAN, Some(1))
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_INTEGRITY");
}

// === Configuration ===

#[test]
fn test_config_from_json_drives_engine() {
    let buffer = create_test_image(8, 8, 3);
    let json = serde_json::json!({
        "integrity": 0.7,
        "grain_intensity": 0.0,
        "chroma_active": true,
        "chroma_strength": 1.0,
        "glitch_active": false,
        "glitch_strength": 0.0,
        "output_quality": 66
    });
    let config = DecayConfig::from_json(&json).unwrap();

    let output = DecayEngine::new()
        .decay_with_config(&buffer, &config, Some(1))
        .unwrap();

    assert!(!output.stage_applied("grain"));
    for pixel in output.buffer.samples().chunks_exact(3) {
        assert!(pixel[0].abs_diff(pixel[1]) <= 1);
        assert!(pixel[1].abs_diff(pixel[2]) <= 1);
    }
}
