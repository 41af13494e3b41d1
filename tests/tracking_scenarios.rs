//! End-to-end tracking scenarios against the public API.

use route_tracker::geo_utils::{haversine_distance, offset_meters};
use route_tracker::{
    AreaRecord, GeoPoint, ProximityDetector, RangeConfig, RawFix, RecorderState, Route,
    RouteRecorder, ShopRecord, ShopRegistry, TrackerError, TrackingSession,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn dhaka() -> GeoPoint {
    GeoPoint::new(23.8103, 90.4125)
}

fn registry_with_shop_at(location: GeoPoint) -> ShopRegistry {
    ShopRegistry::new(
        vec![ShopRecord::new(
            "shop-1",
            "Rahman Store",
            "Abdur Rahman",
            location,
            "area-uttara",
        )],
        vec![AreaRecord::new("area-uttara", "Uttara")],
    )
}

#[test]
fn test_jitter_below_spacing_keeps_single_path_point() {
    init_logging();
    let registry = ShopRegistry::empty();
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();

    for north in [1.0, 2.0, 1.5, 0.5, 2.0] {
        let outcome = recorder.on_location_update(offset_meters(&dhaka(), north, 0.0), &registry);
        assert!(!outcome.path_appended);
    }

    assert_eq!(recorder.active_route().unwrap().path.len(), 1);
}

#[test]
fn test_movement_beyond_spacing_appends_path_point() {
    init_logging();
    let registry = ShopRegistry::empty();
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();

    let moved = offset_meters(&dhaka(), 5.0, 0.0);
    let outcome = recorder.on_location_update(moved, &registry);

    assert!(outcome.path_appended);
    let path = &recorder.active_route().unwrap().path;
    assert_eq!(path.len(), 2);
    assert_eq!(path[1], moved);
}

#[test]
fn test_shop_alert_hysteresis() {
    init_logging();
    let shop = offset_meters(&dhaka(), 35.0, 0.0);
    let registry = registry_with_shop_at(shop);
    let mut detector = ProximityDetector::new(RangeConfig::default());

    // 35m away: inside the enter radius
    let events = detector.evaluate(&dhaka(), &registry);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].shop_id, "shop-1");
    assert_eq!(events[0].owner_name, "Abdur Rahman");

    // Between enter and exit radius: no re-arm, no repeat alert
    let band = offset_meters(&shop, -70.0, 0.0);
    assert!(detector.evaluate(&band, &registry).is_empty());
    assert!(detector.evaluate(&dhaka(), &registry).is_empty());
    assert!(detector.alerted().contains("shop-1"));

    // Beyond the exit radius: silently re-armed
    let far = offset_meters(&shop, -150.0, 0.0);
    assert!(detector.evaluate(&far, &registry).is_empty());
    assert!(!detector.alerted().contains("shop-1"));

    assert_eq!(detector.evaluate(&dhaka(), &registry).len(), 1);
}

#[test]
fn test_at_most_one_alert_until_exit() {
    init_logging();
    let shop = dhaka();
    let registry = registry_with_shop_at(shop);
    let mut detector = ProximityDetector::new(RangeConfig::default());

    // Wander between 0 and 95m; never past the exit radius
    let mut alerts = 0;
    for step in 0..40 {
        let north = (step % 20) as f64 * 5.0;
        let location = offset_meters(&shop, north, 0.0);
        assert!(haversine_distance(&location, &shop) < 100.0);
        alerts += detector.evaluate(&location, &registry).len();
    }
    assert_eq!(alerts, 1);
}

#[test]
fn test_dwell_emits_single_stop_with_area_name() {
    init_logging();
    let registry = registry_with_shop_at(offset_meters(&dhaka(), 20.0, 0.0));
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();

    let mut stops = Vec::new();
    for north in [4.0, 8.0, 6.0] {
        if let Some(stop) = recorder
            .on_location_update(offset_meters(&dhaka(), north, 0.0), &registry)
            .stop
        {
            stops.push(stop);
        }
    }

    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].stop_number, 1);
    assert_eq!(stops[0].area_name, "Uttara");
    assert_eq!(recorder.active_route().unwrap().stops.len(), 1);

    // Staying put does not produce a second stop
    for _ in 0..5 {
        let outcome = recorder.on_location_update(dhaka(), &registry);
        assert!(outcome.stop.is_none());
    }
    assert_eq!(recorder.active_route().unwrap().stops.len(), 1);
}

#[test]
fn test_stop_without_nearby_shop_uses_field_label() {
    init_logging();
    let registry = registry_with_shop_at(offset_meters(&dhaka(), 500.0, 0.0));
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();

    let stop = (0..3)
        .filter_map(|_| recorder.on_location_update(dhaka(), &registry).stop)
        .next()
        .unwrap();
    assert_eq!(stop.area_name, "Field Point");
}

#[test]
fn test_second_dwell_episode_emits_next_stop_number() {
    init_logging();
    let registry = ShopRegistry::empty();
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();

    for _ in 0..3 {
        recorder.on_location_update(dhaka(), &registry);
    }

    let elsewhere = offset_meters(&dhaka(), 400.0, 0.0);
    let mut last_stop = None;
    for _ in 0..4 {
        if let Some(stop) = recorder.on_location_update(elsewhere, &registry).stop {
            last_stop = Some(stop);
        }
    }

    assert_eq!(last_stop.unwrap().stop_number, 2);
    assert_eq!(recorder.active_route().unwrap().stops.len(), 2);
}

#[test]
fn test_finalize_then_restart() {
    init_logging();
    let registry = ShopRegistry::empty();
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();
    recorder.on_location_update(offset_meters(&dhaka(), 50.0, 0.0), &registry);

    let route = recorder.finalize("Saturday", "Uttara Trip").unwrap();
    assert!(route.end_time.is_some());
    assert!(route.end_time.unwrap() >= route.start_time);
    assert_eq!(route.day_label.as_deref(), Some("Saturday"));
    assert_eq!(route.custom_area_name.as_deref(), Some("Uttara Trip"));
    assert!(!route.is_archived);
    assert_eq!(route.path.len(), 2);

    assert_eq!(recorder.state(), RecorderState::Idle);
    assert!(recorder.active_route().is_none());
    assert!(recorder.start(dhaka(), "area-uttara").is_ok());
}

#[test]
fn test_finalized_route_survives_json() {
    init_logging();
    let mut recorder = RouteRecorder::new();
    recorder.start(dhaka(), "area-uttara").unwrap();
    recorder.on_location_update(offset_meters(&dhaka(), 120.0, 0.0), &ShopRegistry::empty());
    let route = recorder.finalize("Sunday", "Gulshan Loop").unwrap();

    let json = route.to_json().unwrap();
    assert!(json.contains("\"customAreaName\":\"Gulshan Loop\""));

    let restored = Route::from_json(&json).unwrap();
    assert_eq!(restored.id, route.id);
    assert_eq!(restored.path.len(), route.path.len());
    assert_eq!(restored.end_time, route.end_time);
}

#[test]
fn test_start_while_recording_is_rejected() {
    init_logging();
    let mut recorder = RouteRecorder::new();
    let first_id = recorder.start(dhaka(), "area-uttara").unwrap().id.clone();

    match recorder.start(offset_meters(&dhaka(), 300.0, 0.0), "area-other") {
        Err(TrackerError::RecordingConflict { route_id }) => assert_eq!(route_id, first_id),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(recorder.active_route().unwrap().path[0], dhaka());
}

#[test]
fn test_session_walk_past_shop() {
    init_logging();
    let shop = offset_meters(&dhaka(), 200.0, 0.0);
    let registry = registry_with_shop_at(shop);
    let mut session = TrackingSession::new();
    session.start(dhaka(), "area-uttara").unwrap();

    let mut entered = Vec::new();
    for step in 0..=40 {
        let raw = offset_meters(&dhaka(), step as f64 * 10.0, 0.0);
        let update = session
            .on_fix(RawFix::new(raw.lat, raw.lng, 5.0), &registry)
            .unwrap();
        entered.extend(update.entered);
    }

    assert_eq!(entered.len(), 1);
    assert_eq!(entered[0].shop_name, "Rahman Store");

    let route = session.finalize("Monday", "Shop Run").unwrap();
    assert!(route.path.len() > 10);
    // The filter lags a steady walk, so the recorded path is shorter than the raw one
    assert!(route.total_distance_m() > 150.0);
    assert!(!session.is_recording());
}
