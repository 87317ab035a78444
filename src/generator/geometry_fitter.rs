//! 刚体几何拟合
//!
//! 1. 方向：协方差主特征向量作为拟合坐标系 Z 轴（可关闭，关闭时与骨骼对齐）
//! 2. 尺寸：拟合坐标系下的包围盒；最小半尺寸低于最小图元尺寸时三轴一起取该下限
//! 3. 按几何类型输出图元

use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use super::decompose::ConvexDecomposer;
use super::principal_axis::{covariance, dominant_eigenvector, frame_from_axis};
use super::triangle_cache::TriangleOwnership;
use super::vertex_collector::BoneVertInfo;
use crate::physics::{ConvexHull, GenerationParams, GeometryKind, Primitive, RetainedBody};
use crate::skeleton::{BoneTransform, Skeleton};
use crate::{PhysGenError, Result};

/// 协方差迹低于此值视为没有主方向
const MIN_COVARIANCE_TRACE: f32 = 1.0e-8;

/// 拟合选项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub auto_orient: bool,
    pub min_primitive_size: f32,
    pub fudge: f32,
    pub hull_accuracy: f32,
    pub max_hull_vertices: usize,
}

impl From<&GenerationParams> for FitOptions {
    fn from(p: &GenerationParams) -> Self {
        Self {
            auto_orient: p.auto_orient_to_bone,
            min_primitive_size: p.min_primitive_size.max(0.0),
            fudge: p.primitive_fudge,
            hull_accuracy: p.hull_accuracy,
            max_hull_vertices: p.max_hull_vertices,
        }
    }
}

/// 拟合坐标系 + 包围盒半尺寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedBox {
    pub rotation: Quat,
    /// 盒中心（骨骼局部空间）
    pub center: Vec3,
    pub half_extents: Vec3,
}

/// 刚体几何拟合器
///
/// 多凸包类型需要三角形归属缓存和凸分解器；其它类型不需要。
pub struct BodyGeometryFitter<'a> {
    skeleton: &'a Skeleton,
    options: FitOptions,
    triangles: Option<&'a TriangleOwnership<'a>>,
    decomposer: Option<&'a dyn ConvexDecomposer>,
}

impl<'a> BodyGeometryFitter<'a> {
    pub fn new(skeleton: &'a Skeleton, options: FitOptions) -> Self {
        Self { skeleton, options, triangles: None, decomposer: None }
    }

    /// 注入多凸包所需的能力
    pub fn with_decomposition(
        mut self,
        triangles: &'a TriangleOwnership<'a>,
        decomposer: &'a dyn ConvexDecomposer,
    ) -> Self {
        self.triangles = Some(triangles);
        self.decomposer = Some(decomposer);
        self
    }

    /// 计算拟合坐标系与包围盒
    ///
    /// 空集以骨骼原点为中心，退化为最小图元尺寸。
    /// 任一轴半尺寸低于下限时（薄片、单点），三轴都取下限。
    pub fn fit_box(&self, positions: &[Vec3]) -> FittedBox {
        let rotation = if self.options.auto_orient {
            principal_rotation(positions)
        } else {
            Quat::IDENTITY
        };

        let inv = rotation.inverse();
        let mut iter = positions.iter().map(|p| inv * *p);
        let (center_f, half) = match iter.next() {
            Some(first) => {
                let (lo, hi) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
                ((lo + hi) * 0.5, (hi - lo) * 0.5)
            }
            None => (Vec3::ZERO, Vec3::ZERO),
        };

        let floor = self.options.min_primitive_size;
        let half_extents = if half.min_element() < floor { Vec3::splat(floor) } else { half };

        FittedBox { rotation, center: rotation * center_f, half_extents }
    }

    /// 为骨骼拟合刚体
    ///
    /// `merged_bones` 只影响多凸包类型（并入骨骼的三角形一并参与分解）。
    pub fn fit(
        &self,
        bone_index: usize,
        info: &BoneVertInfo,
        merged_bones: &[usize],
        kind: GeometryKind,
    ) -> Result<RetainedBody> {
        let insufficient = PhysGenError::InsufficientData { bone: bone_index };
        if kind.requires_vertices() && info.is_empty() {
            return Err(insufficient);
        }

        let floor = Vec3::splat(self.options.min_primitive_size);
        let fudge = self.options.fudge;

        let (local_frame, primitives) = match kind {
            GeometryKind::Box => {
                let fitted = self.fit_box(&info.positions);
                let half_extents = (fitted.half_extents * fudge).max(floor);
                (frame_of(&fitted), vec![Primitive::Box { half_extents }])
            }
            GeometryKind::Sphere => {
                let fitted = self.fit_box(&info.positions);
                let radius = (fitted.half_extents.max_element() * fudge).max(self.options.min_primitive_size);
                (frame_of(&fitted), vec![Primitive::Sphere { radius }])
            }
            GeometryKind::Capsule => {
                let fitted = self.fit_box(&info.positions);
                let (swap, radius, half_height) = capsule_dimensions(fitted.half_extents);
                let frame = BoneTransform::from_rotation_translation(
                    (fitted.rotation * swap).normalize(),
                    fitted.center,
                );
                let radius = (radius * fudge).max(self.options.min_primitive_size);
                (frame, vec![Primitive::Capsule { radius, half_height: half_height * fudge }])
            }
            GeometryKind::SingleHull => (
                BoneTransform::IDENTITY,
                vec![Primitive::ConvexHull(ConvexHull::new(info.positions.clone()))],
            ),
            GeometryKind::MultiHull => {
                let (Some(triangles), Some(decomposer)) = (self.triangles, self.decomposer) else {
                    log::warn!("[PhysGen] 多凸包缺少三角形缓存或凸分解器，骨骼 {}", bone_index);
                    return Err(insufficient);
                };
                let mut sources = Vec::with_capacity(merged_bones.len() + 1);
                sources.push(bone_index);
                sources.extend_from_slice(merged_bones);

                let (vertices, indices) = triangles.vertices_and_indices_for_bones(bone_index, &sources);
                if vertices.is_empty() || indices.is_empty() {
                    return Err(insufficient);
                }
                let hulls: Vec<Primitive> = decomposer
                    .decompose(
                        &vertices,
                        &indices,
                        self.options.hull_accuracy,
                        self.options.max_hull_vertices,
                    )
                    .into_iter()
                    .filter(|h| !h.vertices.is_empty())
                    .map(Primitive::ConvexHull)
                    .collect();
                if hulls.is_empty() {
                    return Err(insufficient);
                }
                (BoneTransform::IDENTITY, hulls)
            }
        };

        Ok(RetainedBody {
            bone_index,
            bone_name: self
                .skeleton
                .get(bone_index)
                .map(|b| b.name.clone())
                .unwrap_or_default(),
            geometry_kind: kind,
            local_frame,
            primitives,
            merged_bones: merged_bones.to_vec(),
            forced: false,
        })
    }
}

fn frame_of(fitted: &FittedBox) -> BoneTransform {
    BoneTransform::from_rotation_translation(fitted.rotation, fitted.center)
}

/// 点集主方向对应的旋转；点太少或没有方差时为单位旋转
fn principal_rotation(positions: &[Vec3]) -> Quat {
    let cov = covariance(positions);
    let trace = cov.x_axis.x + cov.y_axis.y + cov.z_axis.z;
    if trace <= MIN_COVARIANCE_TRACE {
        return Quat::IDENTITY;
    }
    frame_from_axis(dominant_eigenvector(cov))
}

/// 胶囊体：长轴沿最长半尺寸，返回 (把局部 Z 转到长轴的旋转, 半径, 半长)
///
/// 半径取另外两轴半尺寸的较大者，长度取最长轴的全长，半长即最长半尺寸的一半。
fn capsule_dimensions(half: Vec3) -> (Quat, f32, f32) {
    let (swap, longest, radius) = if half.z >= half.x && half.z >= half.y {
        (Quat::IDENTITY, half.z, half.x.max(half.y))
    } else if half.x >= half.y {
        // Z → X
        (Quat::from_rotation_y(FRAC_PI_2), half.x, half.y.max(half.z))
    } else {
        // Z → Y
        (Quat::from_rotation_x(-FRAC_PI_2), half.y, half.x.max(half.z))
    };
    (swap, radius, longest * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneLink;

    struct CannedDecomposer {
        hulls: Vec<ConvexHull>,
    }

    impl ConvexDecomposer for CannedDecomposer {
        fn decompose(&self, _: &[Vec3], _: &[u32], _: f32, _: usize) -> Vec<ConvexHull> {
            self.hulls.clone()
        }
    }

    fn skeleton() -> Skeleton {
        Skeleton::new(vec![BoneLink::new("bone", None, BoneTransform::IDENTITY)]).unwrap()
    }

    fn options(auto_orient: bool) -> FitOptions {
        FitOptions {
            auto_orient,
            min_primitive_size: 0.5,
            fudge: 1.01,
            hull_accuracy: 0.5,
            max_hull_vertices: 16,
        }
    }

    fn slab() -> BoneVertInfo {
        // x∈[-4,4], y∈[-1,1], z∈[-2,2]
        let mut info = BoneVertInfo::default();
        for i in 0..8 {
            let p = Vec3::new(
                if i & 1 == 0 { -4.0 } else { 4.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -2.0 } else { 2.0 },
            );
            info.push(p + Vec3::new(0.0, 3.0, 0.0), Vec3::Y);
        }
        info
    }

    #[test]
    fn test_box_without_orientation() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let body = fitter.fit(0, &slab(), &[], GeometryKind::Box).unwrap();
        assert!(body.local_frame.translation.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
        let Primitive::Box { half_extents } = body.primitives[0] else {
            panic!("expected box");
        };
        assert!(half_extents.abs_diff_eq(Vec3::new(4.0, 1.0, 2.0) * 1.01, 1e-4));
    }

    #[test]
    fn test_auto_orient_aligns_z_with_long_axis() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(true));
        let mut info = BoneVertInfo::default();
        for i in 0..20 {
            let t = i as f32;
            info.push(Vec3::new(t, t, 1.0), Vec3::Y);
            info.push(Vec3::new(t, t, -1.0), Vec3::Y);
            info.push(Vec3::new(t + 1.0, t - 1.0, 0.0), Vec3::Y);
            info.push(Vec3::new(t - 1.0, t + 1.0, 0.0), Vec3::Y);
        }
        let fitted = fitter.fit_box(&info.positions);
        let z = fitted.rotation * Vec3::Z;
        assert!((z.dot(Vec3::new(1.0, 1.0, 0.0).normalize()).abs() - 1.0).abs() < 1e-3);
        assert!(fitted.half_extents.z > fitted.half_extents.x);
        assert!(fitted.half_extents.z > fitted.half_extents.y);
    }

    #[test]
    fn test_capsule_long_axis_swap() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let body = fitter.fit(0, &slab(), &[], GeometryKind::Capsule).unwrap();
        let Primitive::Capsule { radius, half_height } = body.primitives[0] else {
            panic!("expected capsule");
        };
        // 最长轴为 X：胶囊局部 Z 应指向骨骼 X
        let axis = body.local_frame.rotation * Vec3::Z;
        assert!(axis.abs_diff_eq(Vec3::X, 1e-5));
        assert!((radius - 2.0 * 1.01).abs() < 1e-4);
        assert!((half_height - 2.0 * 1.01).abs() < 1e-4);
    }

    #[test]
    fn test_capsule_along_y() {
        assert!(
            (Quat::from_rotation_x(-FRAC_PI_2) * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5)
        );
        let (swap, radius, half_height) = capsule_dimensions(Vec3::new(1.0, 5.0, 2.0));
        assert!((swap * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(radius, 2.0);
        assert_eq!(half_height, 2.5);
    }

    #[test]
    fn test_capsule_radius_from_short_axes() {
        let (swap, radius, half_height) = capsule_dimensions(Vec3::new(1.0, 10.0, 1.0));
        assert!((swap * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(radius, 1.0);
        assert_eq!(half_height, 5.0);

        // x∈[-1,1], y∈[-10,10], z∈[-1,1]
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let mut info = BoneVertInfo::default();
        for i in 0..8 {
            info.push(
                Vec3::new(
                    if i & 1 == 0 { -1.0 } else { 1.0 },
                    if i & 2 == 0 { -10.0 } else { 10.0 },
                    if i & 4 == 0 { -1.0 } else { 1.0 },
                ),
                Vec3::Y,
            );
        }
        let body = fitter.fit(0, &info, &[], GeometryKind::Capsule).unwrap();
        let Primitive::Capsule { radius, half_height } = body.primitives[0] else {
            panic!("expected capsule");
        };
        assert!((radius - 1.01).abs() < 1e-4);
        assert!((half_height - 5.05).abs() < 1e-4);
        assert!((body.local_frame.rotation * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_thin_plate_clamps_all_axes() {
        // 10×10×0 的平板：Z 向为零，三轴一起取下限
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let mut plate = BoneVertInfo::default();
        for (x, y) in [(-5.0, -5.0), (5.0, -5.0), (-5.0, 5.0), (5.0, 5.0)] {
            plate.push(Vec3::new(x, y, 0.0), Vec3::Z);
        }
        assert_eq!(fitter.fit_box(&plate.positions).half_extents, Vec3::splat(0.5));

        let body = fitter.fit(0, &plate, &[], GeometryKind::Box).unwrap();
        let Primitive::Box { half_extents } = body.primitives[0] else {
            panic!("expected box");
        };
        assert!(half_extents.abs_diff_eq(Vec3::splat(0.505), 1e-5), "{half_extents:?}");
    }

    #[test]
    fn test_sphere_radius() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let body = fitter.fit(0, &slab(), &[], GeometryKind::Sphere).unwrap();
        assert_eq!(body.primitives, vec![Primitive::Sphere { radius: 4.0 * 1.01 }]);
    }

    #[test]
    fn test_floor_on_single_point_and_empty() {
        let s = skeleton();
        for auto in [false, true] {
            let fitter = BodyGeometryFitter::new(&s, options(auto));
            let mut single = BoneVertInfo::default();
            single.push(Vec3::new(1.0, 2.0, 3.0), Vec3::Y);
            for info in [single, BoneVertInfo::default()] {
                for kind in [GeometryKind::Box, GeometryKind::Sphere, GeometryKind::Capsule] {
                    let body = fitter.fit(0, &info, &[], kind).unwrap();
                    let half = body.primitives[0].half_extents().unwrap();
                    assert!(half.min_element() >= 0.5, "{kind:?} {half:?}");
                }
            }
        }
    }

    #[test]
    fn test_hulls_need_vertices() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(false));
        let empty = BoneVertInfo::default();
        assert_eq!(
            fitter.fit(0, &empty, &[], GeometryKind::SingleHull),
            Err(PhysGenError::InsufficientData { bone: 0 })
        );
        assert_eq!(
            fitter.fit(0, &slab(), &[], GeometryKind::MultiHull),
            Err(PhysGenError::InsufficientData { bone: 0 })
        );
    }

    #[test]
    fn test_single_hull_uses_all_positions() {
        let s = skeleton();
        let fitter = BodyGeometryFitter::new(&s, options(true));
        let info = slab();
        let body = fitter.fit(0, &info, &[], GeometryKind::SingleHull).unwrap();
        assert_eq!(body.local_frame, BoneTransform::IDENTITY);
        assert_eq!(body.primitives, vec![Primitive::ConvexHull(ConvexHull::new(info.positions))]);
    }

    #[test]
    fn test_multi_hull_with_canned_decomposer() {
        use crate::mesh::{SkinnedMesh, SkinnedVertex};
        use crate::physics::VertexWeighting;

        let s = skeleton();
        let mesh = SkinnedMesh::new(
            vec![
                SkinnedVertex::rigid(Vec3::ZERO, Vec3::Z, 0),
                SkinnedVertex::rigid(Vec3::X, Vec3::Z, 0),
                SkinnedVertex::rigid(Vec3::Y, Vec3::Z, 0),
            ],
            vec![0, 1, 2],
        );
        let cache = TriangleOwnership::build(&mesh, &s, VertexWeighting::DominantWeight);
        let info = super::super::vertex_collector::collect_bone_vertices(&mesh, &s, VertexWeighting::DominantWeight);

        let canned = CannedDecomposer {
            hulls: vec![ConvexHull::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]), ConvexHull::default()],
        };
        let fitter = BodyGeometryFitter::new(&s, options(false)).with_decomposition(&cache, &canned);
        let body = fitter.fit(0, &info[0], &[], GeometryKind::MultiHull).unwrap();
        assert_eq!(body.hull_count(), 1);

        let nothing = CannedDecomposer { hulls: vec![] };
        let fitter = BodyGeometryFitter::new(&s, options(false)).with_decomposition(&cache, &nothing);
        assert_eq!(
            fitter.fit(0, &info[0], &[], GeometryKind::MultiHull),
            Err(PhysGenError::InsufficientData { bone: 0 })
        );
    }
}
