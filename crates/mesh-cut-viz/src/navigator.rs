//! Interactive browsing of a mesh's polygons and their adjacency.

use macroquad::prelude::*;
use mesh_cut::{Edge, Mesh, PolygonId};

use crate::draw_outline;

/// Selects one polygon and one of its edges, and walks across edges to
/// neighbouring polygons.
///
/// The selection is kept as indices and re-resolved against the mesh on
/// every call, so it survives cuts that replace the selected polygon.
#[derive(Debug, Default)]
pub struct PolygonInspector {
    polygon: usize,
    edge: usize,
}

impl PolygonInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected polygon, if the mesh has any.
    pub fn current(&self, mesh: &Mesh) -> Option<PolygonId> {
        let ids = mesh.polygon_ids();
        if ids.is_empty() {
            return None;
        }
        Some(ids[self.polygon % ids.len()])
    }

    /// The selected edge of the selected polygon.
    pub fn current_edge(&self, mesh: &Mesh) -> Option<Edge> {
        let edges = mesh.adjacent_edges(self.current(mesh)?)?;
        if edges.is_empty() {
            return None;
        }
        Some(edges[self.edge % edges.len()])
    }

    /// The polygons on the other side of the selected edge.
    pub fn neighbours(&self, mesh: &Mesh) -> Vec<PolygonId> {
        let (Some(id), Some(edge)) = (self.current(mesh), self.current_edge(mesh)) else {
            return Vec::new();
        };
        mesh.adjacent_polygons(edge)
            .iter()
            .copied()
            .filter(|&other| other != id)
            .collect()
    }

    pub fn next_polygon(&mut self, mesh: &Mesh) {
        let count = mesh.polygon_count().max(1);
        self.polygon = (self.polygon % count + 1) % count;
        self.edge = 0;
    }

    pub fn previous_polygon(&mut self, mesh: &Mesh) {
        let count = mesh.polygon_count().max(1);
        self.polygon = (self.polygon % count + count - 1) % count;
        self.edge = 0;
    }

    pub fn next_edge(&mut self) {
        self.edge += 1;
    }

    /// Moves the selection across the selected edge. Returns false on a
    /// boundary edge.
    pub fn cross_edge(&mut self, mesh: &Mesh) -> bool {
        let Some(target) = self.neighbours(mesh).first().copied() else {
            return false;
        };
        let Some(index) = mesh.polygon_ids().iter().position(|&id| id == target) else {
            return false;
        };
        self.polygon = index;
        self.edge = 0;
        true
    }

    /// Handles keyboard input. Returns true if the selection changed.
    pub fn update(&mut self, mesh: &Mesh) -> bool {
        let mut changed = false;
        if is_key_pressed(KeyCode::N) {
            self.next_polygon(mesh);
            changed = true;
        }
        if is_key_pressed(KeyCode::P) {
            self.previous_polygon(mesh);
            changed = true;
        }
        if is_key_pressed(KeyCode::E) {
            self.next_edge();
            changed = true;
        }
        if is_key_pressed(KeyCode::A) {
            changed |= self.cross_edge(mesh);
        }
        changed
    }

    /// Highlights the selection in 3D: the polygon in white, the edge in
    /// yellow, the neighbours in green.
    pub fn render(&self, mesh: &Mesh) {
        let Some(id) = self.current(mesh) else {
            return;
        };
        for neighbour in self.neighbours(mesh) {
            draw_outline(mesh, neighbour, GREEN);
        }
        draw_outline(mesh, id, WHITE);
        if let Some(edge) = self.current_edge(mesh) {
            let (a, b) = edge.vertices();
            if let (Some(pa), Some(pb)) = (mesh.world_position(a), mesh.world_position(b)) {
                draw_line_3d(vec3(pa.x, pa.y, pa.z), vec3(pb.x, pb.y, pb.z), YELLOW);
            }
        }
    }

    /// Draws the selection overlay.
    pub fn draw_ui(&self, mesh: &Mesh, y_offset: f32) {
        let Some(id) = self.current(mesh) else {
            draw_text("No polygons", 10.0, y_offset, 18.0, WHITE);
            return;
        };
        let (vertices, area) = mesh
            .polygon(id)
            .map(|p| (p.len(), p.area(mesh.positions())))
            .unwrap_or((0, 0.0));
        let edge = self
            .current_edge(mesh)
            .map(|e| e.to_string())
            .unwrap_or_else(|| "-".to_string());
        let neighbours = self.neighbours(mesh);

        draw_text(
            &format!("Polygon {id}: {vertices} vertices, area {area:.3}"),
            10.0,
            y_offset,
            18.0,
            WHITE,
        );
        draw_text(
            &format!("Edge {edge}: {} neighbour(s)", neighbours.len()),
            10.0,
            y_offset + 20.0,
            18.0,
            if neighbours.is_empty() { ORANGE } else { GREEN },
        );
        draw_text(
            "[N]ext | [P]revious | [E]dge | [A]cross",
            10.0,
            y_offset + 40.0,
            16.0,
            DARKGRAY,
        );
    }
}
