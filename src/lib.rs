//! 蒙皮网格自动生成物理资产（布娃娃刚体骨架）
//!
//! 流程：顶点归属收集 → 骨骼尺寸合并 → 逐骨骼几何拟合 → 关节生成 → 重叠消解。
//! 整个过程是一次性的离线批处理，不保留任何运行间状态。

pub mod skeleton;
pub mod mesh;
pub mod physics;
pub mod generator;

pub use skeleton::{Bone, BoneLink, BoneSet, BoneTransform, Skeleton};
pub use mesh::{BoneInfluence, SkinnedMesh, SkinnedVertex};
pub use physics::{
    get_config, reset_config, set_config, AngularConstraintMode, CollisionDisableTable,
    ConvexHull, GenerationParams, GeometryKind, Joint, PhysicsAsset, Primitive, RetainedBody,
    VertexWeighting,
};
pub use generator::{
    BoneVertInfo, ConvexDecomposer, GenerationProgress, PhysicsAssetGenerator, VhacdDecomposer,
};

use thiserror::Error;

/// 物理资产生成错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysGenError {
    /// 单个骨骼的几何体无法构建（可跳过该骨骼继续）
    #[error("Insufficient data to build body for bone {bone}")]
    InsufficientData { bone: usize },

    /// 整个网格没有三角形或没有任何带权重的顶点（致命）
    #[error("Degenerate mesh: {0}")]
    DegenerateMesh(String),

    /// 尺寸阈值淘汰了所有候选刚体（可减小 min_bone_size 重试）
    #[error("No bodies generated (min_bone_size = {min_bone_size})")]
    NoBodiesGenerated { min_bone_size: f32 },

    /// 骨骼层级不合法
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),
}

pub type Result<T> = std::result::Result<T, PhysGenError>;
