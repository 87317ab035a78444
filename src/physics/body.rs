//! 生成的刚体

use glam::Vec3;

use super::GeometryKind;
use crate::skeleton::BoneTransform;

/// 凸包（刚体局部空间顶点）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvexHull {
    pub vertices: Vec<Vec3>,
}

impl ConvexHull {
    pub fn new(vertices: Vec<Vec3>) -> Self {
        Self { vertices }
    }

    /// 局部空间包围盒 (min, max)
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))))
    }
}

/// 碰撞图元（所在坐标系为刚体的 local_frame）
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// 长轴沿局部 Z；half_height 为圆柱段半长（不含半球）
    Capsule { radius: f32, half_height: f32 },
    ConvexHull(ConvexHull),
}

impl Primitive {
    /// 解析图元的半尺寸（凸包返回 None）
    pub fn half_extents(&self) -> Option<Vec3> {
        match *self {
            Primitive::Box { half_extents } => Some(half_extents),
            Primitive::Sphere { radius } => Some(Vec3::splat(radius)),
            Primitive::Capsule { radius, half_height } => {
                Some(Vec3::new(radius, radius, half_height + radius))
            }
            Primitive::ConvexHull(_) => None,
        }
    }
}

/// 保留骨骼对应的刚体
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedBody {
    /// 关联骨骼索引
    pub bone_index: usize,
    /// 关联骨骼名称
    pub bone_name: String,
    pub geometry_kind: GeometryKind,
    /// 拟合坐标系（相对骨骼）
    pub local_frame: BoneTransform,
    pub primitives: Vec<Primitive>,
    /// 合并进本刚体的骨骼（不含自身）
    pub merged_bones: Vec<usize>,
    /// 仅因强制根规则而保留
    pub forced: bool,
}

impl RetainedBody {
    /// 凸包总数
    pub fn hull_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| matches!(p, Primitive::ConvexHull(_)))
            .count()
    }
}
