use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

#[test]
fn headless_run_prints_scene_summary() {
    let mut cmd = Command::cargo_bin("scene-runtime").expect("binary exists");
    cmd.arg("--summary-only").arg("--frames").arg("8");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 5 nodes (3 lights)"))
        .stdout(contains("Rendered 8 frames headless"))
        .stdout(contains("Final scene state:"))
        .stdout(contains(" - Turf pos=(0.00, 0.00, 0.00) material=Grass"))
        .stdout(contains(" - SpinnerWest pos=(-3.00, 3.00, 0.00) material=Brass"))
        .stdout(contains(" - Rover pos=("))
        .stdout(contains("camera mode=Free pos=(0.00, 4.00, 20.00) fov=45.0"));
}

#[test]
fn unknown_argument_is_rejected() {
    let mut cmd = Command::cargo_bin("scene-runtime").expect("binary exists");
    cmd.arg("--bogus");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --bogus"));
}

#[test]
fn invalid_texture_file_fails_up_front() {
    let mut tmp = NamedTempFile::new().expect("temp texture");
    tmp.write_all(b"definitely not an image")
        .expect("write texture");

    let mut cmd = Command::cargo_bin("scene-runtime").expect("binary exists");
    cmd.arg("--summary-only")
        .arg("--frames")
        .arg("1")
        .arg("--texture")
        .arg(tmp.path());
    cmd.assert()
        .failure()
        .stderr(contains("failed to decode texture"));
}
