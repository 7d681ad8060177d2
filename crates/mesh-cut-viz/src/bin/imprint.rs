use std::sync::Arc;

use macroquad::prelude::*;
use mesh_cut::{Mesh, MeshResult};
use mesh_cut_viz::{
    draw_axes, draw_mesh_edges, draw_mesh_polygons, generate_plate, OrbitCamera, PolygonInspector,
    RecordingSink,
};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

const PLATE_SIZE: f32 = 6.0;
const STAMP_SIZE: f32 = 2.5;

/// A large plate and a smaller one lying on it, turned about the shared normal.
fn build_scene(angle: f32) -> MeshResult<(Mesh, Mesh)> {
    let plate = generate_plate(PLATE_SIZE)?;
    let stamp = generate_plate(STAMP_SIZE)?.with_frame(Arc::new(Isometry3::from_parts(
        Translation3::new(0.8, 0.0, -0.4),
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle),
    )));
    Ok((plate, stamp))
}

#[macroquad::main("Mesh Cut Imprint")]
async fn main() {
    let mut angle = 0.6;
    let (mut plate, mut stamp) = match build_scene(angle) {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("Failed to build scene: {err}");
            return;
        }
    };

    let mut camera = OrbitCamera::new(10.0, 0.0, 1.0).with_zoom(1.0, 3.0, 40.0);
    let mut inspector = PolygonInspector::new();
    let mut sink = RecordingSink::new();
    let mut status = String::from("[I]mprint | [Q]/[W] turn stamp");

    loop {
        camera.update();
        inspector.update(&plate);

        let turn = if is_key_pressed(KeyCode::Q) {
            -0.1
        } else if is_key_pressed(KeyCode::W) {
            0.1
        } else {
            0.0
        };
        if turn != 0.0 {
            angle += turn;
            match build_scene(angle) {
                Ok(scene) => (plate, stamp) = scene,
                Err(err) => status = format!("Failed to rebuild scene: {err}"),
            }
            sink.clear();
        }

        if is_key_pressed(KeyCode::I) {
            sink.clear();
            let before = plate.polygon_count();
            status = match plate.cut_with_sink(&stamp, &mut sink) {
                Ok(report) if report.cut_applied => format!(
                    "Imprinted: {} -> {} polygons, area {:.4}",
                    before,
                    plate.polygon_count(),
                    plate.area()
                ),
                Ok(_) => "Nothing to imprint".to_string(),
                Err(err) => format!("Imprint failed: {err}"),
            };
            println!("{status}");
        }

        clear_background(Color::from_rgba(15, 15, 25, 255));
        set_camera(&camera.to_camera3d());

        draw_mesh_polygons(&plate);
        draw_mesh_edges(&plate, BLACK);
        draw_mesh_edges(&stamp, SKYBLUE);
        sink.draw();
        inspector.render(&plate);
        draw_axes(2.0);

        set_default_camera();

        draw_text(&status, 10.0, 25.0, 20.0, WHITE);
        draw_text(
            &format!("Stamp angle: {angle:.2} rad"),
            10.0,
            45.0,
            18.0,
            GRAY,
        );
        inspector.draw_ui(&plate, 70.0);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 135.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
