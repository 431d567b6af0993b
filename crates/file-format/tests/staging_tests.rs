use std::fs;

use file_format::{ArtifactCodec, CodecError, EphemeralScope};
use geom_kernel::{Kernel, KernelIntrospect, MockKernel, TruckKernel};

// ── Helper Functions ─────────────────────────────────────────────────────

fn leftovers(dir: &std::path::Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

// ── Round Trips Through a Scope ──────────────────────────────────────────

#[test]
fn mock_model_round_trips_through_scope() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let codec = ArtifactCodec::new(&kernel);

    let upload = kernel
        .export_step(&kernel.make_box(10.0, 10.0, 10.0).unwrap())
        .unwrap();

    let bytes = {
        let mut scope = EphemeralScope::new(dir.path());
        let input = scope.stage_input(upload.as_bytes()).unwrap().to_path_buf();
        let shape = codec.import(&input).unwrap();
        scope.release_input();

        let moved = kernel.translate(&shape, [5.0, 0.0, 0.0]).unwrap();
        let output = scope.allocate_output().unwrap().to_path_buf();
        codec.export(&moved, &output).unwrap();
        scope.take_output().unwrap()
    };

    assert!(leftovers(dir.path()).is_empty(), "left: {:?}", leftovers(dir.path()));
    let text = String::from_utf8(bytes).unwrap();
    let back = kernel.import_step(&text).unwrap();
    let props = kernel.mass_properties(&back).unwrap();
    assert!((props.volume - 1000.0).abs() < 1e-9);
    assert!((props.center_of_mass[0] - 10.0).abs() < 1e-9);
}

#[test]
fn truck_box_round_trips_through_scope() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = TruckKernel::new();
    let codec = ArtifactCodec::new(&kernel);

    let mut scope = EphemeralScope::new(dir.path());
    let output = scope.allocate_output().unwrap().to_path_buf();
    codec
        .export(&kernel.make_box(10.0, 10.0, 10.0).unwrap(), &output)
        .unwrap();
    let bytes = scope.take_output().unwrap();
    assert!(bytes.starts_with(b"ISO-10303-21;"));

    let input = scope.stage_input(&bytes).unwrap().to_path_buf();
    let shape = codec.import(&input).unwrap();
    drop(scope);

    let volume = kernel.mass_properties(&shape).unwrap().volume;
    assert!((volume - 1000.0).abs() < 1.0, "volume was {volume}");
    assert!(leftovers(dir.path()).is_empty());
}

// ── Failure Paths ────────────────────────────────────────────────────────

#[test]
fn failed_import_still_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let kernel = MockKernel::new();
    let result = {
        let mut scope = EphemeralScope::new(dir.path());
        let input = scope.stage_input(b"garbage").unwrap().to_path_buf();
        ArtifactCodec::new(&kernel).import(&input)
    };
    assert!(matches!(result, Err(CodecError::Import { .. })));
    assert!(leftovers(dir.path()).is_empty());
}

#[test]
fn restaging_replaces_previous_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut scope = EphemeralScope::new(dir.path());
    let first = scope.stage_input(b"one").unwrap().to_path_buf();
    let second = scope.stage_input(b"two").unwrap().to_path_buf();
    assert!(!first.exists());
    assert_eq!(fs::read(second).unwrap(), b"two");
    assert_eq!(leftovers(dir.path()).len(), 1);
}
