//! 物理资产生成
//!
//! 各阶段独立成模块，由 PhysicsAssetGenerator 串联：
//! - vertex_collector：顶点按权重归属到骨骼
//! - size_merger：小骨骼并入父骨骼，强制公共根
//! - triangle_cache / decompose：多凸包所需的三角形归属与凸分解
//! - geometry_fitter：主轴定向 + 图元拟合
//! - joint_synth / overlap：关节与碰撞禁用表

mod vertex_collector;
mod triangle_cache;
mod size_merger;
mod principal_axis;
mod decompose;
mod geometry_fitter;
mod joint_synth;
mod overlap;
mod pipeline;

pub use vertex_collector::{attributed_bones, collect_bone_vertices, BoneVertInfo, MIN_INFLUENCE_WEIGHT};
pub use triangle_cache::TriangleOwnership;
pub use size_merger::{merge_small_bones, merge_small_bones_seeded, MergeParams, MergeResult};
pub use principal_axis::{covariance, dominant_eigenvector, frame_from_axis, POWER_ITERATIONS};
pub use decompose::{keep_largest_hulls, limit_hull_vertices, ConvexDecomposer, VhacdDecomposer};
pub use geometry_fitter::{BodyGeometryFitter, FitOptions, FittedBox};
pub use joint_synth::{body_lookup, synthesize};
pub use overlap::{resolve_overlaps, resolve_with};
pub use pipeline::{GenerationProgress, PhysicsAssetGenerator};
