//! 物理资产生成配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

use super::{AngularConstraintMode, GeometryKind, VertexWeighting};

/// 生成配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    // ========== 骨骼筛选 ==========
    /// 最小骨骼尺寸，默认 20.0
    /// 包围盒对角线小于此值的骨骼会合并到父骨骼
    pub min_bone_size: f32,
    /// 最小焊接尺寸，默认 1e-4
    /// 小于此值的骨骼数据直接丢弃（既不合并也不保留）
    pub min_weld_size: f32,
    /// 为每根骨骼都生成刚体（忽略尺寸），默认 false
    pub body_for_all: bool,
    /// 跳过小骨骼时是否把数据合并到父骨骼，默认 true
    /// false 时小骨骼的数据直接丢弃，关节越过它连接到更上层
    pub walk_past_small: bool,
    /// 没有生成任何刚体时，用此 min_bone_size 重试一次，默认 Some(1.0)
    pub retry_min_bone_size: Option<f32>,

    // ========== 几何体 ==========
    /// 碰撞几何类型，默认胶囊体
    pub geometry_kind: GeometryKind,
    /// 顶点归属规则，默认主权重
    pub vertex_weight: VertexWeighting,
    /// 是否用主成分方向对齐几何体，默认 true
    pub auto_orient_to_bone: bool,
    /// 图元最小半尺寸，默认 0.5
    pub min_primitive_size: f32,
    /// 图元尺寸放大系数（避免表面重合），默认 1.01
    pub primitive_fudge: f32,

    // ========== 凸分解 ==========
    /// 凸分解精度 [0, 1]，默认 0.5
    pub hull_accuracy: f32,
    /// 每个凸包最大顶点数，默认 16
    pub max_hull_vertices: usize,
    /// 每个刚体最多凸包数，默认 8
    pub max_convex_hulls: u32,

    // ========== 关节 ==========
    /// 是否生成关节，默认 true
    pub create_joints: bool,
    /// 关节角度约束模式，默认 Limited
    pub angular_constraint_mode: AngularConstraintMode,
    /// Limited 模式下 swing/twist 限制角（度），默认 45.0
    pub angular_limit_degrees: f32,

    // ========== 碰撞 ==========
    /// 绑定姿态下相互重叠的刚体禁用碰撞，默认 true
    pub disable_overlapping_collisions: bool,

    // ========== 性能 ==========
    /// 逐骨骼拟合是否并行（rayon），默认 false
    pub parallel_fitting: bool,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            // ====== 骨骼筛选 ======
            min_bone_size: 20.0,
            // 足够小，只剔除真正可以忽略的几何
            min_weld_size: 1.0e-4,
            body_for_all: false,
            walk_past_small: true,
            retry_min_bone_size: Some(1.0),

            // ====== 几何体 ======
            geometry_kind: GeometryKind::Capsule,
            vertex_weight: VertexWeighting::DominantWeight,
            auto_orient_to_bone: true,
            min_primitive_size: 0.5,
            primitive_fudge: 1.01,

            // ====== 凸分解 ======
            hull_accuracy: 0.5,
            max_hull_vertices: 16,
            max_convex_hulls: 8,

            // ====== 关节 ======
            create_joints: true,
            angular_constraint_mode: AngularConstraintMode::Limited,
            angular_limit_degrees: 45.0,

            // ====== 碰撞 ======
            disable_overlapping_collisions: true,

            // ====== 性能 ======
            parallel_fitting: false,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static GENERATION_CONFIG: Lazy<RwLock<GenerationParams>> = Lazy::new(|| {
    RwLock::new(GenerationParams::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> GenerationParams {
    GENERATION_CONFIG.read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// 手动设置配置
pub fn set_config(config: GenerationParams) {
    *GENERATION_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    *GENERATION_CONFIG.write().unwrap_or_else(|e| e.into_inner()) = GenerationParams::default();
}
