//! 绑定姿态重叠检测用的临时物理世界
//!
//! 只在 OverlapResolver 调用期间存在，独占，不与任何运行中的模拟共享。
//! 默认实现使用 Rapier3D 的 ColliderSet + parry 相交测试。

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::parry::bounding_volume::BoundingVolume;
use rapier3d::parry::query;
use rapier3d::prelude::*;

use super::{Primitive, RetainedBody};

/// 临时物理世界能力
pub trait ScratchWorld {
    /// 按世界变换放置刚体；任何图元都无法构建时返回 false
    fn add_body(&mut self, body_index: usize, body: &RetainedBody, world: Mat4) -> bool;

    /// 两个已放置刚体是否几何重叠
    fn overlaps(&self, a: usize, b: usize) -> bool;
}

/// 退化判断阈值
const DEGENERATE_EPS: f32 = 1.0e-4;

/// Rapier 临时世界（只含静态碰撞体）
pub struct RapierScratchWorld {
    /// 碰撞体集合
    collider_set: ColliderSet,
    /// 刚体索引 → 碰撞体句柄
    body_colliders: HashMap<usize, Vec<ColliderHandle>>,
}

impl Default for RapierScratchWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierScratchWorld {
    pub fn new() -> Self {
        Self {
            collider_set: ColliderSet::new(),
            body_colliders: HashMap::new(),
        }
    }

    /// 已放置的碰撞体数量
    pub fn collider_count(&self) -> usize {
        self.collider_set.len()
    }

    /// 图元 → (相对刚体的偏移, Rapier 形状)
    fn build_shape(primitive: &Primitive) -> Option<(Isometry<Real>, SharedShape)> {
        let shape = match primitive {
            Primitive::Box { half_extents: h } => SharedShape::cuboid(h.x, h.y, h.z),
            Primitive::Sphere { radius } => SharedShape::ball(*radius),
            Primitive::Capsule { radius, half_height } => {
                if *half_height <= DEGENERATE_EPS {
                    SharedShape::ball(*radius)
                } else {
                    SharedShape::capsule_z(*half_height, *radius)
                }
            }
            Primitive::ConvexHull(hull) => {
                if !spans_volume(&hull.vertices) {
                    // 共面/共线点集无法构建凸包，退化为薄包围盒
                    let (lo, hi) = hull.bounds()?;
                    let half = ((hi - lo) * 0.5).max(Vec3::splat(DEGENERATE_EPS));
                    let center = (lo + hi) * 0.5;
                    return Some((
                        Isometry::translation(center.x, center.y, center.z),
                        SharedShape::cuboid(half.x, half.y, half.z),
                    ));
                }
                let points: Vec<Point<Real>> = hull
                    .vertices
                    .iter()
                    .map(|v| point![v.x, v.y, v.z])
                    .collect();
                SharedShape::convex_hull(&points)?
            }
        };
        Some((Isometry::identity(), shape))
    }
}

impl ScratchWorld for RapierScratchWorld {
    fn add_body(&mut self, body_index: usize, body: &RetainedBody, world: Mat4) -> bool {
        let body_pose = to_isometry(world * body.local_frame.to_matrix());
        let mut handles = Vec::with_capacity(body.primitives.len());

        for primitive in &body.primitives {
            match Self::build_shape(primitive) {
                Some((offset, shape)) => {
                    let collider = ColliderBuilder::new(shape).position(body_pose * offset).build();
                    handles.push(self.collider_set.insert(collider));
                }
                None => {
                    log::warn!(
                        "[PhysGen] 刚体 '{}' 的图元无法放入临时世界，跳过",
                        body.bone_name
                    );
                }
            }
        }

        let placed = !handles.is_empty();
        self.body_colliders.insert(body_index, handles);
        placed
    }

    fn overlaps(&self, a: usize, b: usize) -> bool {
        let (Some(ha), Some(hb)) = (self.body_colliders.get(&a), self.body_colliders.get(&b)) else {
            return false;
        };

        for &h1 in ha {
            for &h2 in hb {
                let (Some(c1), Some(c2)) = (self.collider_set.get(h1), self.collider_set.get(h2)) else {
                    continue;
                };
                if !c1.compute_aabb().intersects(&c2.compute_aabb()) {
                    continue;
                }
                match query::intersection_test(c1.position(), c1.shape(), c2.position(), c2.shape()) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(_) => {
                        log::debug!("[PhysGen] 刚体 {} 与 {} 的形状组合不支持相交测试", a, b);
                    }
                }
            }
        }
        false
    }
}

/// glam 矩阵 → Rapier 等距变换（忽略缩放）
pub(crate) fn to_isometry(m: Mat4) -> Isometry<Real> {
    let (_, r, t) = m.to_scale_rotation_translation();
    Isometry::from_parts(
        Translation3::new(t.x, t.y, t.z),
        UnitQuaternion::new_normalize(Quaternion::new(r.w, r.x, r.y, r.z)),
    )
}

/// 点集是否张成三维体积（存在非退化四面体）
fn spans_volume(points: &[Vec3]) -> bool {
    if points.len() < 4 {
        return false;
    }
    let p0 = points[0];
    let Some(p1) = farthest(points, |p| p.distance_squared(p0)) else {
        return false;
    };
    let axis = p1 - p0;
    if axis.length_squared() <= DEGENERATE_EPS * DEGENERATE_EPS {
        return false;
    }
    let Some(p2) = farthest(points, |p| axis.cross(p - p0).length_squared()) else {
        return false;
    };
    let normal = axis.cross(p2 - p0);
    if normal.length_squared() <= DEGENERATE_EPS * DEGENERATE_EPS {
        return false;
    }
    let normal = normal.normalize();
    points.iter().any(|p| normal.dot(*p - p0).abs() > DEGENERATE_EPS)
}

fn farthest(points: &[Vec3], metric: impl Fn(Vec3) -> f32) -> Option<Vec3> {
    points
        .iter()
        .copied()
        .max_by(|a, b| metric(*a).total_cmp(&metric(*b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{ConvexHull, GeometryKind};
    use crate::skeleton::BoneTransform;

    fn body(primitive: Primitive) -> RetainedBody {
        RetainedBody {
            bone_index: 0,
            bone_name: "b".into(),
            geometry_kind: GeometryKind::Box,
            local_frame: BoneTransform::IDENTITY,
            primitives: vec![primitive],
            merged_bones: Vec::new(),
            forced: false,
        }
    }

    #[test]
    fn test_overlapping_boxes() {
        let mut world = RapierScratchWorld::new();
        let b = body(Primitive::Box { half_extents: Vec3::ONE });
        assert!(world.add_body(0, &b, Mat4::IDENTITY));
        assert!(world.add_body(1, &b, Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0))));
        assert!(world.add_body(2, &b, Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0))));
        assert!(world.overlaps(0, 1));
        assert!(world.overlaps(1, 0));
        assert!(!world.overlaps(0, 2));
    }

    #[test]
    fn test_sphere_capsule_overlap() {
        let mut world = RapierScratchWorld::new();
        world.add_body(0, &body(Primitive::Sphere { radius: 1.0 }), Mat4::IDENTITY);
        world.add_body(
            1,
            &body(Primitive::Capsule { radius: 0.5, half_height: 2.0 }),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)),
        );
        assert!(world.overlaps(0, 1));
    }

    #[test]
    fn test_flat_hull_falls_back_to_box() {
        let flat = ConvexHull::new(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]);
        let mut world = RapierScratchWorld::new();
        assert!(world.add_body(0, &body(Primitive::ConvexHull(flat)), Mat4::IDENTITY));
        assert_eq!(world.collider_count(), 1);
    }

    #[test]
    fn test_spans_volume() {
        let tetra = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        assert!(spans_volume(&tetra));
        assert!(!spans_volume(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::X + Vec3::Y]));
        assert!(!spans_volume(&[Vec3::ZERO, Vec3::X]));
    }

    #[test]
    fn test_unknown_body_never_overlaps() {
        let world = RapierScratchWorld::new();
        assert!(!world.overlaps(0, 1));
    }
}
