use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use print_placement::{
    CanvasBounds, CanvasDimensions, Configurable, EngineConfig, EngineError, ExportPreset,
    NodeId, PlacementProfile, Point, ProductArea, RenderSurface, SceneNode, Shape, SizeF,
    SourceHandle, SurfaceEvent, SurfaceState, compute_canvas_size,
};

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
    out
}

fn surface(size: &str, shape: Shape, container: f64) -> RenderSurface {
    let product = ProductArea::parse_size(size, shape).unwrap();
    RenderSurface::new(EngineConfig::default(), product, SizeF::new(container, container)).unwrap()
}

#[test]
fn catalogue_sizes_get_proportional_canvases() {
    let bounds = CanvasBounds::default();
    for (label, expected) in [
        ("5x5", (600, 600)),
        ("2x3", (400, 600)),
        ("2.5x3.5", (429, 600)),
        ("4.75x2", (600, 280)),
    ] {
        let area = ProductArea::parse_size(label, Shape::Square).unwrap();
        let canvas = compute_canvas_size(SizeF::new(600.0, 600.0), area.aspect_ratio(), bounds).unwrap();
        assert_eq!((canvas.width, canvas.height), expected, "{label}");
    }
}

#[test]
fn inline_data_url_source_loads() {
    let bytes = png(64, 32, [10, 20, 30, 255]);
    let url = format!(
        "data:image/png;base64,{}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes)
    );
    let mut s = surface("5x5", Shape::Round, 800.0);
    let request = s
        .set_source(Some(SourceHandle::from_data_url(&url).unwrap()))
        .unwrap();
    let inline = request.inline_bytes().unwrap().to_vec();
    s.complete_load(request.token, &inline).unwrap();
    assert_eq!(s.asset().unwrap().natural_size().width, 64);
}

#[test]
fn full_session_round_trip() {
    let mut s = surface("5x5", Shape::Round, 800.0);
    let request = s.set_source(Some(SourceHandle::url("art.png"))).unwrap();
    s.complete_load(request.token, &png(2000, 1000, [200, 0, 0, 255]))
        .unwrap();

    let t = s.transform().unwrap();
    assert!((t.scale_x() - 0.27).abs() < 1e-9);
    assert_eq!(t.scale_x(), t.scale_y());
    assert_eq!((t.center_x(), t.center_y()), (300.0, 300.0));

    s.scale_gesture(1.5);
    s.drag_by(-40.0, 25.0);
    s.rotate_by(90.0);
    let json = s.commit().to_json().unwrap();

    let events = s.drain_events();
    assert_eq!(events.first(), Some(&SurfaceEvent::SurfaceReady));
    assert!(matches!(events.last(), Some(SurfaceEvent::TransformCommitted(_))));

    // A second session in a smaller container restores the same relative
    // placement.
    let mut restored = surface("5x5", Shape::Round, 600.0);
    let request = restored.set_source(Some(SourceHandle::url("art.png"))).unwrap();
    restored.complete_load(request.token, &png(2000, 1000, [200, 0, 0, 255]))
        .unwrap();
    restored
        .apply_profile(&PlacementProfile::from_json(&json).unwrap())
        .unwrap();

    let a = s.transform().unwrap();
    let b = restored.transform().unwrap();
    let ratio = restored.canvas().width as f64 / s.canvas().width as f64;
    assert_eq!(restored.user_scale(), 1.5);
    assert_eq!(b.angle_degrees(), 90.0);
    assert!((b.center_x() - a.center_x() * ratio).abs() < 1e-6);
    assert!((b.center_y() - a.center_y() * ratio).abs() < 1e-6);
}

#[test]
fn round_export_is_clipped_and_transparent_outside() {
    let mut s = surface("5x5", Shape::Round, 800.0);
    let request = s.set_source(Some(SourceHandle::url("fill.png"))).unwrap();
    s.complete_load(request.token, &png(100, 100, [0, 200, 0, 255]))
        .unwrap();
    s.set_user_scale(4.0);

    let export = s.export_preset(ExportPreset::Thumbnail).unwrap();
    assert_eq!((export.width, export.height), (300, 300));
    let pixels = image::load_from_memory(&export.png).unwrap().to_rgba8();
    assert_eq!(pixels.get_pixel(2, 2)[3], 0);
    assert!(pixels.get_pixel(150, 150)[3] > 250);
}

#[test]
fn rejects_non_raster_upload() {
    let mut s = surface("2x3", Shape::Square, 800.0);
    let request = s.set_source(Some(SourceHandle::url("vector.svg"))).unwrap();
    let err = s
        .complete_load(request.token, br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#)
        .unwrap_err();
    assert!(matches!(err, EngineError::DecodeFailure { .. }));
    assert!(matches!(s.status(), SurfaceState::Failed { .. }));

    // Export still works on an empty print area.
    let export = s.export_raster(1.0).unwrap();
    assert_eq!(
        CanvasDimensions::new(export.width, export.height),
        s.canvas()
    );
}

#[test]
fn scene_orders_guides_below_image() {
    let mut s = surface("5x5", Shape::Square, 800.0);
    s.set_show_grid(true);
    let request = s.set_source(Some(SourceHandle::url("a.png"))).unwrap();
    s.complete_load(request.token, &png(10, 10, [0, 0, 0, 255]))
        .unwrap();

    let scene = s.scene();
    let nodes = scene.nodes();
    assert_eq!(nodes.first().map(SceneNode::id), Some(NodeId::Boundary));
    assert_eq!(nodes.last().map(SceneNode::id), Some(NodeId::Image));
    assert!(nodes[..nodes.len() - 1].iter().all(SceneNode::is_guide));
}

#[test]
fn drag_is_clamped_to_visible_area() {
    let mut s = surface("5x5", Shape::Square, 800.0);
    let request = s.set_source(Some(SourceHandle::url("a.png"))).unwrap();
    s.complete_load(request.token, &png(300, 300, [0, 0, 0, 255]))
        .unwrap();

    s.drag_to(Point::new(-1.0e6, 1.0e6));
    let t = s.transform().unwrap();
    let footprint = t.footprint(s.asset().unwrap().natural_size());
    let canvas = s.canvas();
    // At least a quarter of the footprint stays on the canvas.
    let visible_x = (t.center_x() + footprint.width / 2.0).min(canvas.width as f64);
    let visible_y = canvas.height as f64 - (t.center_y() - footprint.height / 2.0);
    assert!(visible_x >= footprint.width * 0.25 - 1e-6);
    assert!(visible_y >= footprint.height * 0.25 - 1e-6);
}
