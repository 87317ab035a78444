//! 物理资产数据结构
//!
//! 生成结果：刚体（每根保留骨骼一个）、关节、碰撞禁用表，
//! 以及绑定姿态重叠检测用的临时物理世界。

mod config;
mod body;
mod joint;
mod collision;
mod asset;
mod scratch_world;

pub use config::{get_config, reset_config, set_config, GenerationParams};
pub use body::{ConvexHull, Primitive, RetainedBody};
pub use joint::{AngularLimits, Joint};
pub use collision::CollisionDisableTable;
pub use asset::PhysicsAsset;
pub use scratch_world::{RapierScratchWorld, ScratchWorld};

/// 碰撞几何类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Box,
    Sphere,
    Capsule,
    /// 单个凸包（直接使用骨骼全部顶点）
    SingleHull,
    /// 多凸包（凸分解）
    MultiHull,
}

impl GeometryKind {
    /// 是否需要顶点数据才能构建（凸包类型无法从空集退化）
    #[inline]
    pub fn requires_vertices(&self) -> bool {
        matches!(self, GeometryKind::SingleHull | GeometryKind::MultiHull)
    }
}

/// 顶点归属规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexWeighting {
    /// 只归属到权重最大的骨骼（并列时全部归属）
    DominantWeight,
    /// 归属到所有权重不低于最小非零阈值的骨骼
    AnyWeight,
}

/// 关节角度约束模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AngularConstraintMode {
    Free,
    Limited,
    Locked,
}
