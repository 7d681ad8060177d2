use std::sync::Arc;

use macroquad::prelude::*;
use mesh_cut::{DebugKind, Mesh, MeshResult};
use mesh_cut_viz::{
    draw_axes, draw_mesh_edges, draw_mesh_polygons, draw_shaded, generate_plate,
    generate_rotated_cube, OrbitCamera, PolygonInspector, RecordingSink,
};
use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// A rotated cube and a tilted plate passing through it.
fn build_scene() -> MeshResult<(Mesh, Mesh)> {
    let rotation = Rotation3::from_euler_angles(0.3, 0.4, 0.25);
    let cube = generate_rotated_cube(Point3::new(0.0, 0.0, 0.0), 2.0, &rotation)?;

    let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.35);
    let plate = generate_plate(5.0)?.with_frame(Arc::new(Isometry3::from_parts(
        Translation3::new(0.0, 0.2, 0.0),
        tilt,
    )));
    Ok((cube, plate))
}

#[macroquad::main("Mesh Cut")]
async fn main() {
    let (mut cube, mut plate) = match build_scene() {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("Failed to build scene: {err}");
            return;
        }
    };
    let (original_cube, original_plate) = (cube.clone(), plate.clone());
    println!(
        "Cube: {} polygons, plate: {} polygons",
        cube.polygon_count(),
        plate.polygon_count()
    );

    let mut camera = OrbitCamera::new(8.0, 0.6, 0.4).with_zoom(1.0, 3.0, 40.0);
    camera.focus(&cube);
    let mut inspector = PolygonInspector::new();
    let mut sink = RecordingSink::new();
    let mut shaded = false;
    let mut show_plate = true;
    let mut status = String::from("[C]ut cube | [D]ual cut | [X] reset");

    loop {
        camera.update();
        inspector.update(&cube);

        if is_key_pressed(KeyCode::C) {
            sink.clear();
            status = match cube.cut_with_sink(&plate, &mut sink) {
                Ok(report) => format!(
                    "Cut: {} operations, {} edges, {} polygons",
                    report.operations,
                    report.edges.len(),
                    cube.polygon_count()
                ),
                Err(err) => format!("Cut failed: {err}"),
            };
            println!("{status}");
        }
        if is_key_pressed(KeyCode::D) {
            sink.clear();
            status = match cube.dual_cut(&mut plate) {
                Ok((forward, backward)) => format!(
                    "Dual cut: cube {} edges, plate {} edges",
                    forward.edges.len(),
                    backward.edges.len()
                ),
                Err(err) => format!("Dual cut failed: {err}"),
            };
            println!("{status}");
        }
        if is_key_pressed(KeyCode::X) {
            cube = original_cube.clone();
            plate = original_plate.clone();
            sink.clear();
            status = String::from("Reset");
        }
        if is_key_pressed(KeyCode::S) {
            shaded = !shaded;
        }
        if is_key_pressed(KeyCode::H) {
            show_plate = !show_plate;
        }

        clear_background(Color::from_rgba(15, 15, 25, 255));
        set_camera(&camera.to_camera3d());

        if shaded {
            draw_shaded(&cube, LIGHTGRAY, Vector3::new(0.4, 1.0, 0.6));
        } else {
            draw_mesh_polygons(&cube);
        }
        draw_mesh_edges(&cube, BLACK);
        if show_plate {
            draw_mesh_edges(&plate, SKYBLUE);
        }
        sink.draw();
        inspector.render(&cube);
        draw_axes(3.0);

        set_default_camera();

        draw_text(&status, 10.0, 25.0, 20.0, WHITE);
        draw_text(
            &format!(
                "Cube: {} polygons | Plate: {} polygons | Cut edges: {}",
                cube.polygon_count(),
                plate.polygon_count(),
                sink.segment_count(DebugKind::CutEdge)
            ),
            10.0,
            45.0,
            18.0,
            GRAY,
        );
        inspector.draw_ui(&cube, 70.0);

        draw_text(
            "[S]haded | [H]ide plate | drag to rotate, scroll to zoom",
            10.0,
            135.0,
            16.0,
            DARKGRAY,
        );
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 155.0, 16.0, DARKGRAY);

        next_frame().await
    }
}
