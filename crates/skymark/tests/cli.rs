#![cfg(feature = "cli")]

use assert_cmd::Command;
use nalgebra::{Isometry3, Point2};
use predicates::prelude::*;
use skymark::detect::code::cell_bit;
use skymark::localize::MapLandmark;
use skymark::{CameraIntrinsics, EgoPose, LandmarkMap, LocalizerConfig};
use std::path::Path;

const ID: u16 = cell_bit(1, 0) | cell_bit(2, 1);

fn camera() -> CameraIntrinsics {
    CameraIntrinsics::new(500.0, 500.0, 160.0, 120.0)
}

fn map() -> LandmarkMap {
    LandmarkMap::from_landmarks([MapLandmark::from_identity(
        ID,
        Isometry3::translation(0.0, 0.0, 2.0),
        0.05,
    )
    .unwrap()])
    .unwrap()
}

/// Config plus one rendered frame seen from the origin.
fn write_fixture(dir: &Path) {
    LocalizerConfig::new(&map(), camera())
        .write_json(dir.join("config.json"))
        .unwrap();

    let pose = EgoPose::default();
    let cam = camera();
    let mut img = skymark::core::GrayImage::new(320, 240);
    img.data.iter_mut().for_each(|v| *v = 30);
    for lm in map().iter() {
        for p in lm.world_points() {
            let uv = cam.project(&pose.world_to_camera(&p));
            img.fill_disk(Point2::new(uv.x as f32, uv.y as f32), 3.0, 250);
        }
    }
    image::GrayImage::from_raw(320, 240, img.data)
        .unwrap()
        .save(dir.join("frame.png"))
        .unwrap();
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("skymark")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect").and(predicate::str::contains("localize")));
}

#[test]
fn detect_prints_identified_landmarks() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let out = Command::cargo_bin("skymark")
        .unwrap()
        .current_dir(dir.path())
        .args(["detect", "--config", "config.json", "frame.png"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let landmarks = report[0]["landmarks"].as_array().unwrap();
    assert_eq!(landmarks.len(), 1);
    assert_eq!(landmarks[0]["identity"], serde_json::json!(ID));
}

#[test]
fn localize_prints_one_pose_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    Command::cargo_bin("skymark")
        .unwrap()
        .current_dir(dir.path())
        .args(["localize", "--config", "config.json", "frame.png", "frame.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"frame\":1").and(predicate::str::contains("\"pose\"")));
}

#[test]
fn missing_config_fails() {
    Command::cargo_bin("skymark")
        .unwrap()
        .args(["detect", "--config", "does-not-exist.json", "frame.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn unreadable_frame_is_reported_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

    let out = Command::cargo_bin("skymark")
        .unwrap()
        .current_dir(dir.path())
        .args(["localize", "--config", "config.json", "frame.png", "broken.png", "frame.png"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].get("error").is_none());
    assert_eq!(lines[1]["frame"], 1);
    assert!(lines[1]["error"].is_string());
    assert_eq!(lines[1]["pose"], lines[0]["pose"]);
    assert_eq!(lines[2]["frame"], 2);
    assert_eq!(lines[2]["outcome"]["outcome"], "solved");
}

#[test]
fn detect_keeps_going_past_a_bad_image() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();

    let out = Command::cargo_bin("skymark")
        .unwrap()
        .current_dir(dir.path())
        .args(["detect", "--config", "config.json", "broken.png", "frame.png"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(report[0]["error"].is_string());
    assert_eq!(report[0]["landmarks"].as_array().unwrap().len(), 0);
    assert!(report[1].get("error").is_none());
    assert_eq!(report[1]["landmarks"].as_array().unwrap().len(), 1);
}
