//! 生成的关节

use super::AngularConstraintMode;
use crate::skeleton::BoneTransform;

/// 角度限制（弧度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularLimits {
    pub mode: AngularConstraintMode,
    pub swing1: f32,
    pub swing2: f32,
    pub twist: f32,
}

impl AngularLimits {
    /// 按模式生成限制；Free/Locked 下角度无意义，统一置 0
    pub fn from_mode(mode: AngularConstraintMode, limit_degrees: f32) -> Self {
        let angle = match mode {
            AngularConstraintMode::Limited => limit_degrees.max(0.0).to_radians(),
            AngularConstraintMode::Free | AngularConstraintMode::Locked => 0.0,
        };
        Self { mode, swing1: angle, swing2: angle, twist: angle }
    }
}

/// 关节：连接子刚体与最近的保留祖先刚体
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub child_bone: usize,
    pub parent_bone: usize,
    /// 子刚体在 PhysicsAsset::bodies 中的索引
    pub child_body: usize,
    /// 父刚体在 PhysicsAsset::bodies 中的索引
    pub parent_body: usize,
    /// 子骨骼空间中的关节坐标系（恒为单位变换）
    pub child_frame: BoneTransform,
    /// 父骨骼空间中的关节坐标系（子骨骼原点在父骨骼中的位置）
    pub parent_frame: BoneTransform,
    /// 两刚体之间是否碰撞
    pub collision_enabled: bool,
    pub angular: AngularLimits,
}
