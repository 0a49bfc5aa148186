use approx::assert_relative_eq;
use nalgebra::{Isometry3, Point2, UnitQuaternion, Vector3};
use skymark_detect::code::cell_bit;
use skymark_detect::LandmarkObservation;
use skymark_localize::{
    CameraIntrinsics, EgoPose, EstimatorParams, LandmarkMap, LocalizeError, MapLandmark,
    PoseEstimator, TrackingState, UpdateOutcome,
};

fn id_a() -> u16 {
    cell_bit(1, 0) | cell_bit(2, 1)
}

fn id_b() -> u16 {
    cell_bit(1, 1) | cell_bit(2, 2) | cell_bit(3, 1)
}

fn camera() -> CameraIntrinsics {
    CameraIntrinsics::new(800.0, 800.0, 400.0, 300.0)
}

fn map() -> LandmarkMap {
    LandmarkMap::from_landmarks([
        MapLandmark::from_identity(id_a(), Isometry3::translation(0.0, 0.0, 2.0), 0.1).unwrap(),
        MapLandmark::from_identity(
            id_b(),
            Isometry3::new(Vector3::new(1.0, 0.0, 2.2), Vector3::new(0.0, 0.0, 0.7)),
            0.1,
        )
        .unwrap(),
    ])
    .unwrap()
}

/// Exact projection of a mapped landmark from `pose`.
fn observe(est: &PoseEstimator, pose: &EgoPose, id: u16) -> LandmarkObservation {
    let cam = camera();
    let px: Vec<Point2<f32>> = est
        .world_map()
        .get(id)
        .unwrap()
        .points
        .iter()
        .map(|p| {
            let uv = cam.project(&pose.world_to_camera(p));
            Point2::new(uv.x as f32, uv.y as f32)
        })
        .collect();
    LandmarkObservation {
        corners: [px[0], px[1], px[2]],
        id_points: px[3..].to_vec(),
        identity: Some(id),
    }
}

fn truth() -> EgoPose {
    EgoPose::new(
        Vector3::new(0.45, -0.03, 0.1),
        UnitQuaternion::from_euler_angles(0.02, -0.01, 0.05),
    )
}

#[test]
fn converges_to_the_true_pose_from_two_landmarks() {
    let mut est = PoseEstimator::new(&map(), camera(), EstimatorParams::default());
    let truth = truth();

    for _ in 0..3 {
        let frame = [observe(&est, &truth, id_a()), observe(&est, &truth, id_b())];
        let outcome = est.update(&frame, 1.0 / 30.0).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Solved(_)));
    }

    let report = est.last_report().unwrap();
    assert!(report.converged, "{report:?}");
    assert_eq!(est.residual_count(), 6);
    assert_eq!(est.state(), TrackingState::Tracking);

    let pose = est.pose();
    assert!((pose.position - truth.position).norm() < 0.01, "{pose:?}");
    assert!(pose.orientation.angle_to(&truth.orientation) < 0.01);
}

#[test]
fn first_frame_of_one_landmark_starts_tracking() {
    let first = cell_bit(1, 0) | cell_bit(2, 1);
    let second = cell_bit(1, 1) | cell_bit(2, 2);
    let map = LandmarkMap::from_landmarks([
        MapLandmark::from_identity(first, Isometry3::translation(0.0, 0.0, 2.0), 0.1).unwrap(),
        MapLandmark::from_identity(second, Isometry3::translation(1.0, 0.0, 2.0), 0.1).unwrap(),
    ])
    .unwrap();
    let mut est = PoseEstimator::new(&map, camera(), EstimatorParams::default());
    assert_eq!(est.state(), TrackingState::Uninitialized);
    assert_eq!(est.world_map().get(first).unwrap().points.len(), 5);

    let truth = EgoPose::new(
        Vector3::new(0.3, 0.2, 0.0),
        UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5),
    );
    let obs = observe(&est, &truth, first);
    let outcome = est.update(&[obs], 1.0 / 30.0).unwrap();

    assert!(matches!(outcome, UpdateOutcome::Solved(_)));
    assert_eq!(est.state(), TrackingState::Tracking);
    assert_eq!(est.residual_count(), 3);
    let pose = est.pose();
    assert!((pose.position - truth.position).norm() < 0.01, "{pose:?}");
    assert!(pose.orientation.angle_to(&truth.orientation) < 0.01);
}

#[test]
fn single_landmark_is_enough_to_track() {
    let mut est = PoseEstimator::new(&map(), camera(), EstimatorParams::default());
    let truth = EgoPose::new(
        Vector3::new(0.05, -0.03, 0.1),
        UnitQuaternion::from_euler_angles(0.0, 0.0, 0.05),
    );

    for _ in 0..4 {
        let obs = observe(&est, &truth, id_a());
        est.update(&[obs], 1.0 / 30.0).unwrap();
    }
    let pose = est.pose();
    assert!((pose.position - truth.position).norm() < 0.01, "{pose:?}");
    assert_relative_eq!(pose.yaw(), 0.05, epsilon = 0.01);
}

#[test]
fn camera_never_rises_above_the_height_bound() {
    let mut est = PoseEstimator::new(&map(), camera(), EstimatorParams::default());
    assert_relative_eq!(est.z_upper_bound(), 1.0);

    // Observations consistent only with a camera almost at the ceiling.
    let high = EgoPose::new(Vector3::new(0.0, 0.0, 1.6), UnitQuaternion::identity());
    for _ in 0..3 {
        let obs = observe(&est, &high, id_a());
        est.update(&[obs], 0.1).unwrap();
        assert!(est.pose().position.z <= 1.0 + 1e-12);
    }
}

#[test]
fn failed_frame_keeps_the_last_good_pose() {
    let mut est = PoseEstimator::new(&map(), camera(), EstimatorParams::default());
    let truth = truth();
    let good = [observe(&est, &truth, id_a()), observe(&est, &truth, id_b())];
    est.update(&good, 0.1).unwrap();
    let pose = *est.pose();

    let mut bad = observe(&est, &truth, id_b());
    bad.id_points.truncate(1);
    let frame = [observe(&est, &truth, id_a()), bad];
    let err = est.update(&frame, 0.1).unwrap_err();
    assert!(matches!(
        err,
        LocalizeError::PointCountMismatch { expected: 6, observed: 4, .. }
    ));
    assert_eq!(*est.pose(), pose);
    assert_eq!(est.residual_count(), 6);
}

#[test]
fn map_round_trips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.json");
    let original = map();
    original.write_json(&path).unwrap();
    let loaded = LandmarkMap::load_json(&path).unwrap();

    assert_eq!(loaded.len(), 2);
    let a = loaded.to_world();
    let b = original.to_world();
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.id, y.id);
        for (p, q) in x.points.iter().zip(&y.points) {
            assert_relative_eq!(*p, *q, epsilon = 1e-9);
        }
    }
}
