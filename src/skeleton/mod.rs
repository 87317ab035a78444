//! 骨骼系统 - 只读的绑定姿态层级
//!
//! 核心设计思想：
//! - BoneLink: 单个骨骼节点（名称、父索引、绑定局部变换）
//! - BoneSet: 拓扑有序的骨骼集合，构建时一次性计算全局绑定矩阵与逆绑定矩阵

mod bone_link;
mod bone_set;

pub use bone_link::BoneLink;
pub use bone_set::BoneSet;

use glam::{Vec3, Quat, Mat4};

// ============================================================================
// 公共类型定义
// ============================================================================

/// 骨骼变换数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// 仅平移
    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    /// 旋转 + 平移（无缩放）
    #[inline]
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self { translation, rotation, scale: Vec3::ONE }
    }

    /// 转换为 4x4 矩阵
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// 从矩阵分解
    #[inline]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self { translation, rotation: rotation.normalize(), scale }
    }

    /// 变换点
    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * p)
    }
}

// ============================================================================
// 类型别名
// ============================================================================

/// Bone 别名
pub type Bone = BoneLink;

/// Skeleton 别名
pub type Skeleton = BoneSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_roundtrip() {
        let t = BoneTransform::from_rotation_translation(
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let back = BoneTransform::from_matrix(t.to_matrix());
        assert!(back.translation.abs_diff_eq(t.translation, 1e-5));
        assert!(back.rotation.abs_diff_eq(t.rotation, 1e-5));
    }

    #[test]
    fn test_transform_point_matches_matrix() {
        let t = BoneTransform {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let p = Vec3::new(1.0, 0.0, 0.0);
        let a = t.transform_point(p);
        let b = t.to_matrix().transform_point3(p);
        assert!(a.abs_diff_eq(b, 1e-5));
        assert!(a.abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
    }
}
