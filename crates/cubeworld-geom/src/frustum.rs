//! View frustum extracted from a view-projection matrix (Griggs-Hartmann) and sphere tests.

use glam::{Mat4, Vec4};

use crate::{Sphere, Vec3};

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Perspective camera as reported by the viewer feed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn looking(position: Vec3, forward: Vec3) -> Self {
        Self {
            position,
            forward,
            up: Vec3::UP,
            fov_y_radians: 70f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Right-handed view-projection with depth mapped to `[0, 1]`.
    pub fn view_projection(&self) -> Mat4 {
        let eye: glam::Vec3 = self.position.into();
        let dir: glam::Vec3 = self.forward.normalized().into();
        let mut up: glam::Vec3 = self.up.into();
        if dir.cross(up).length_squared() < 1e-8 {
            up = glam::Vec3::Z;
        }
        let view = Mat4::look_at_rh(eye, eye + dir, up);
        let proj = Mat4::perspective_rh(self.fov_y_radians, self.aspect.max(1e-3), self.near, self.far);
        proj * view
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(&self.view_projection())
    }
}

/// Six inward-facing planes `(a, b, c, d)` with unit normals.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // depth range is [0, 1]
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// True when the sphere is at least partly inside every plane.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let c: glam::Vec3 = sphere.center.into();
        self.planes
            .iter()
            .all(|p| p.truncate().dot(c) + p.w >= -sphere.radius)
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.intersects_sphere(&Sphere::new(p, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam_forward_z() -> Camera {
        Camera::looking(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn sphere_in_front_is_visible() {
        let f = cam_forward_z().frustum();
        assert!(f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, -50.0), 1.0)));
        assert!(f.contains_point(Vec3::new(0.0, 0.0, -10.0)));
    }

    #[test]
    fn sphere_behind_is_culled() {
        let f = cam_forward_z().frustum();
        assert!(!f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 50.0), 1.0)));
    }

    #[test]
    fn sphere_straddling_near_plane_is_visible() {
        let f = cam_forward_z().frustum();
        assert!(f.intersects_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 2.0), 5.0)));
    }

    #[test]
    fn sphere_far_to_the_side_is_culled() {
        let f = cam_forward_z().frustum();
        assert!(!f.intersects_sphere(&Sphere::new(Vec3::new(500.0, 0.0, -10.0), 4.0)));
    }

    #[test]
    fn vertical_forward_still_builds_a_frustum() {
        let f = Camera::looking(Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0)).frustum();
        assert!(f.contains_point(Vec3::new(0.0, -20.0, 0.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 20.0, 0.0)));
    }
}
