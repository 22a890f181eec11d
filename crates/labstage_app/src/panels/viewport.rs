// SPDX-License-Identifier: MIT OR Apache-2.0
//! Viewport panel - software projection of the composed frame.
//!
//! Entities, particles and stars are projected through the stage camera and
//! drawn back to front with the egui painter. Cubes are drawn face by face,
//! spheres as lit discs and cylinders as capsules.

use crate::session::{Phase, Session};
use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke};
use labstage_sequencer::Rgb;
use labstage_stage::{CameraRig, EntityFrame, Frame, Geometry, Surface};

const ORBIT_SENSITIVITY: f32 = 0.008;
const MAX_POINT_RADIUS: f32 = 6.0;

/// Unit cube faces as (outward normal, corner indices)
const CUBE_FACES: [([f32; 3], [usize; 4]); 6] = [
    ([1.0, 0.0, 0.0], [1, 3, 7, 5]),
    ([-1.0, 0.0, 0.0], [0, 4, 6, 2]),
    ([0.0, 1.0, 0.0], [2, 6, 7, 3]),
    ([0.0, -1.0, 0.0], [0, 1, 5, 4]),
    ([0.0, 0.0, 1.0], [4, 5, 7, 6]),
    ([0.0, 0.0, -1.0], [0, 2, 3, 1]),
];

fn cube_corner(index: usize) -> [f32; 3] {
    let pick = |bit: usize| if index & bit != 0 { 0.5 } else { -0.5 };
    [pick(1), pick(2), pick(4)]
}

fn color(rgb: Rgb, opacity: f32) -> Color32 {
    let [r, g, b] = rgb.to_u8();
    Color32::from_rgba_unmultiplied(r, g, b, (opacity.clamp(0.0, 1.0) * 255.0) as u8)
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len <= f32::EPSILON {
        return [0.0, 1.0, 0.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Lambert term with an ambient floor
fn light_factor(normal: [f32; 3], light_dir: [f32; 3], ambient: f32) -> f32 {
    ambient + (1.0 - ambient) * dot(normalize(normal), light_dir).max(0.0)
}

enum Drawable<'f> {
    Entity(&'f EntityFrame<'f>),
    Point { position: [f32; 3], size: f32, color: Color32 },
}

/// Main scene view
pub struct ViewportPanel {
    /// Stats overlay visibility
    pub show_stats: bool,
}

impl ViewportPanel {
    /// Create a new viewport panel
    pub fn new() -> Self {
        Self { show_stats: false }
    }

    /// Render the viewport
    pub fn ui(&mut self, ui: &mut egui::Ui, session: &mut Session) {
        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());
        let rect = response.rect;

        match session.view() {
            Some(frame) => {
                self.draw_frame(&painter, rect, &frame);
                if self.show_stats {
                    draw_stats(&painter, rect, &frame);
                }
            }
            None => {
                painter.rect_filled(rect, 0.0, Color32::from_rgb(5, 5, 5));
                draw_placeholder(&painter, rect, session.phase());
            }
        }

        if session.is_generating() {
            painter.rect_filled(rect, 0.0, Color32::from_black_alpha(160));
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Synthesizing Physics Model...",
                FontId::proportional(20.0),
                Color32::from_rgb(120, 220, 255),
            );
        }

        if let Some(stage) = session.stage_mut() {
            handle_input(&response, stage.camera_mut());
        }
    }

    fn draw_frame(&self, painter: &egui::Painter, rect: Rect, frame: &Frame<'_>) {
        let environment = frame.environment;
        let camera = frame.camera;
        let aspect = rect.width() / rect.height().max(1.0);
        painter.rect_filled(rect, 0.0, color(environment.background, 1.0));

        for star in frame.stars {
            if let Some(p) = camera.project(*star, aspect) {
                painter.circle_filled(to_screen(rect, p.x, p.y), 0.6, Color32::from_white_alpha(200));
            }
        }

        let mut drawables: Vec<(f32, Drawable<'_>)> = Vec::new();
        for entity in &frame.entities {
            if entity.pose.opacity <= 0.01 {
                continue;
            }
            if let Some(p) = camera.project(entity.pose.position, aspect) {
                drawables.push((p.depth, Drawable::Entity(entity)));
            }
        }
        for effect in &frame.particles {
            let point_color = color(effect.color, effect.opacity);
            for position in &effect.points {
                if let Some(p) = camera.project(*position, aspect) {
                    drawables.push((
                        p.depth,
                        Drawable::Point {
                            position: *position,
                            size: effect.point_size,
                            color: point_color,
                        },
                    ));
                }
            }
        }

        // Back to front
        drawables.sort_by(|a, b| b.0.total_cmp(&a.0));

        let light_dir = normalize(environment.key_light.position);
        for (depth, drawable) in drawables {
            match drawable {
                Drawable::Entity(entity) => {
                    self.draw_entity(painter, rect, camera, entity, light_dir, environment.ambient, environment.bloom);
                }
                Drawable::Point { position, size, color } => {
                    if let Some(p) = camera.project(position, aspect) {
                        let radius = (camera.projected_size(size, depth) * rect.height() * 0.5).clamp(0.5, MAX_POINT_RADIUS);
                        painter.circle_filled(to_screen(rect, p.x, p.y), radius, color);
                    }
                }
            }
        }

        for overlay in &frame.overlays {
            let position = overlay.screen_position([rect.center().x, rect.center().y]);
            let label_pos = Pos2::new(position[0], position[1]);
            if let Some(anchor) = overlay.anchor.and_then(|a| camera.project(a, aspect)) {
                painter.line_segment(
                    [label_pos, to_screen(rect, anchor.x, anchor.y)],
                    Stroke::new(1.0, Color32::from_white_alpha(120)),
                );
            }
            let galley = painter.layout_no_wrap(overlay.text.to_string(), FontId::proportional(13.0), Color32::WHITE);
            let label_rect = Align2::CENTER_CENTER.anchor_size(label_pos, galley.size()).expand(6.0);
            painter.rect_filled(label_rect, 4.0, Color32::from_black_alpha(170));
            painter.rect_stroke(label_rect, 4.0, Stroke::new(1.0, Color32::from_rgb(80, 200, 255)));
            painter.galley(label_rect.shrink(6.0).min, galley, Color32::WHITE);
        }

        if environment.vignette {
            for i in 0..6 {
                let inset = i as f32 * 8.0;
                painter.rect_stroke(
                    rect.shrink(inset),
                    0.0,
                    Stroke::new(8.0, Color32::from_black_alpha(60 - i * 10)),
                );
            }
        }
    }

    fn draw_entity(
        &self,
        painter: &egui::Painter,
        rect: Rect,
        camera: &CameraRig,
        entity: &EntityFrame<'_>,
        light_dir: [f32; 3],
        ambient: f32,
        bloom: f32,
    ) {
        let aspect = rect.width() / rect.height().max(1.0);
        let pose = &entity.pose;
        let opacity = pose.opacity * entity.look.flat_opacity();
        let project = |local: [f32; 3]| {
            camera
                .project(pose.transform_point(local), aspect)
                .map(|p| (to_screen(rect, p.x, p.y), p.depth))
        };

        match entity.geometry {
            Geometry::Cube => {
                let corners: Vec<_> = (0..8).map(|i| project(cube_corner(i))).collect();
                for (normal, indices) in CUBE_FACES {
                    let face_center = pose.transform_point([normal[0] * 0.5, normal[1] * 0.5, normal[2] * 0.5]);
                    let world_normal = sub(face_center, pose.position);
                    if dot(world_normal, sub(camera.position, face_center)) <= 0.0 {
                        continue;
                    }
                    let Some(points) = indices.iter().map(|&i| corners[i].map(|(pos, _)| pos)).collect::<Option<Vec<_>>>()
                    else {
                        continue;
                    };
                    let shade = entity.look.shade(pose.color, light_factor(world_normal, light_dir, ambient));
                    painter.add(Shape::convex_polygon(
                        points,
                        color(shade, opacity),
                        Stroke::new(0.5, Color32::from_black_alpha(80)),
                    ));
                }
            }
            Geometry::Sphere { .. } => {
                let Some((center, depth)) = project([0.0; 3]) else {
                    return;
                };
                let radius_world = pose.scale.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
                let radius = camera.projected_size(radius_world, depth) * rect.height();
                let facing = sub(camera.position, pose.position);
                let base = entity.look.shade(pose.color, light_factor(facing, light_dir, ambient) * 0.8);
                painter.circle_filled(center, radius, color(base, opacity));

                // Highlight toward the key light
                if let Some(lit) = camera.project(
                    [
                        pose.position[0] + light_dir[0] * radius_world * 0.4,
                        pose.position[1] + light_dir[1] * radius_world * 0.4,
                        pose.position[2] + light_dir[2] * radius_world * 0.4,
                    ],
                    aspect,
                ) {
                    let highlight = entity.look.shade(pose.color, 1.0);
                    painter.circle_filled(to_screen(rect, lit.x, lit.y), radius * 0.45, color(highlight, opacity * 0.6));
                }
                self.draw_glow(painter, entity, center, radius, bloom);
            }
            Geometry::Cylinder { .. } => {
                let (Some((top, depth)), Some((bottom, _))) = (project([0.0, 1.0, 0.0]), project([0.0, -1.0, 0.0])) else {
                    return;
                };
                let radius_world = pose.scale[0].abs().max(pose.scale[2].abs());
                let radius = camera.projected_size(radius_world, depth) * rect.height();
                let side = sub(camera.position, pose.position);
                let shade = entity.look.shade(pose.color, light_factor(side, light_dir, ambient));
                let fill = color(shade, opacity);
                painter.line_segment([top, bottom], Stroke::new(radius * 2.0, fill));
                painter.circle_filled(top, radius, color(entity.look.shade(pose.color, 1.0), opacity));
                painter.circle_filled(bottom, radius, fill);
                self.draw_glow(painter, entity, top.lerp(bottom, 0.5), radius * 1.5, bloom);
            }
        }
    }

    fn draw_glow(&self, painter: &egui::Painter, entity: &EntityFrame<'_>, center: Pos2, radius: f32, bloom: f32) {
        if let Surface::Emissive { .. } = entity.look.surface {
            let strength = (0.25 + bloom * 0.25).min(0.8);
            painter.circle_filled(center, radius * 1.6, color(entity.pose.color, strength * 0.3 * entity.pose.opacity));
        }
    }
}

impl Default for ViewportPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_screen(rect: Rect, x: f32, y: f32) -> Pos2 {
    Pos2::new(rect.left() + x * rect.width(), rect.top() + y * rect.height())
}

fn draw_placeholder(painter: &egui::Painter, rect: Rect, phase: &Phase) {
    let (title, detail, tint) = match phase {
        Phase::Failed(message) => ("⚠ Simulation Error", message.as_str(), Color32::from_rgb(255, 110, 110)),
        Phase::Generating => ("", "", Color32::GRAY),
        Phase::Empty | Phase::Ready => (
            "Ready to Visualize",
            "Enter a topic above to generate a 3D simulation.",
            Color32::from_gray(200),
        ),
    };
    painter.text(rect.center(), Align2::CENTER_BOTTOM, title, FontId::proportional(22.0), tint);
    painter.text(
        rect.center() + egui::vec2(0.0, 8.0),
        Align2::CENTER_TOP,
        detail,
        FontId::proportional(14.0),
        Color32::from_gray(140),
    );
}

fn draw_stats(painter: &egui::Painter, rect: Rect, frame: &Frame<'_>) {
    let camera = frame.camera;
    let lines = [
        format!("Step: {}", frame.step_index + 1),
        format!("Entities: {}", frame.entities.len()),
        format!("Particles: {}", frame.particle_count()),
        format!(
            "Camera: ({:.1}, {:.1}, {:.1})",
            camera.position[0], camera.position[1], camera.position[2]
        ),
    ];
    let mut y = rect.top() + 10.0;
    for line in lines {
        painter.text(
            Pos2::new(rect.left() + 10.0, y),
            Align2::LEFT_TOP,
            line,
            FontId::monospace(12.0),
            Color32::from_gray(200),
        );
        y += 16.0;
    }
}

fn handle_input(response: &egui::Response, camera: &mut CameraRig) {
    if response.dragged_by(egui::PointerButton::Primary) || response.dragged_by(egui::PointerButton::Secondary) {
        let delta = response.drag_delta();
        camera.orbit(-delta.x * ORBIT_SENSITIVITY, delta.y * ORBIT_SENSITIVITY);
    }

    if response.hovered() {
        let scroll = response.ctx.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 {
            camera.zoom(scroll * 0.01);
        }
    }

    if response.double_clicked() {
        camera.zoom_scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_faces_match_normals() {
        for (normal, indices) in CUBE_FACES {
            for i in indices {
                assert!((dot(cube_corner(i), normal) - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_light_factor() {
        let light = normalize([1.0, 1.0, 1.0]);
        assert!((light_factor([-1.0, -1.0, -1.0], light, 0.2) - 0.2).abs() < 1e-6);
        assert!((light_factor([2.0, 2.0, 2.0], light, 0.2) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_to_screen() {
        let rect = Rect::from_min_size(Pos2::new(10.0, 20.0), egui::vec2(200.0, 100.0));
        assert_eq!(to_screen(rect, 0.5, 0.5), rect.center());
        assert_eq!(to_screen(rect, 0.0, 1.0), rect.left_bottom());
    }
}
