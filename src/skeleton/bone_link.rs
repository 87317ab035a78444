//! 骨骼节点
//!
//! BoneLink 是骨骼层级中的单个节点，只携带绑定姿态数据。
//! 全局矩阵在 BoneSet 构建时按拓扑顺序计算：
//! local_to_world = parent.local_to_world * local_to_parent

use glam::Mat4;

use super::BoneTransform;

/// 骨骼节点
#[derive(Clone, Debug)]
pub struct BoneLink {
    // ========================================
    // 静态数据（来自骨骼资产）
    // ========================================

    /// 骨骼名称
    pub name: String,

    /// 骨骼内部索引（由 BoneSet 在构建时写入）
    pub(crate) internal_id: usize,

    /// 父骨骼索引（None 表示根骨骼）
    pub parent_index: Option<usize>,

    /// 绑定姿态下相对父骨骼的局部变换
    pub local_bind: BoneTransform,

    // ========================================
    // 派生数据（构建时计算一次）
    // ========================================

    /// 绑定矩阵（骨骼空间 → 网格空间）
    pub(crate) bind_matrix: Mat4,

    /// 逆绑定矩阵（网格空间 → 骨骼空间）
    pub(crate) inverse_bind: Mat4,
}

impl BoneLink {
    /// 创建新的骨骼节点
    pub fn new(name: impl Into<String>, parent_index: Option<usize>, local_bind: BoneTransform) -> Self {
        Self {
            name: name.into(),
            internal_id: 0,
            parent_index,
            local_bind,
            bind_matrix: Mat4::IDENTITY,
            inverse_bind: Mat4::IDENTITY,
        }
    }

    /// 获取骨骼 ID
    #[inline]
    pub fn link_id(&self) -> usize {
        self.internal_id
    }

    /// 获取父骨骼 ID
    #[inline]
    pub fn parent_id(&self) -> Option<usize> {
        self.parent_index
    }

    /// 是否为根骨骼
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_index.is_none()
    }

    /// 绑定矩阵
    #[inline]
    pub fn bind_matrix(&self) -> Mat4 {
        self.bind_matrix
    }

    /// 逆绑定矩阵
    #[inline]
    pub fn inverse_bind_matrix(&self) -> Mat4 {
        self.inverse_bind
    }
}
