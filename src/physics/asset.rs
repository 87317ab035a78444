//! 生成结果：完整的物理资产

use super::{CollisionDisableTable, Joint, RetainedBody};

/// 物理资产（刚体 + 关节 + 碰撞禁用表）
#[derive(Debug, Clone, Default)]
pub struct PhysicsAsset {
    pub bodies: Vec<RetainedBody>,
    pub joints: Vec<Joint>,
    pub collision_disable: CollisionDisableTable,
}

impl PhysicsAsset {
    /// 骨骼对应的刚体索引
    pub fn body_for_bone(&self, bone_index: usize) -> Option<usize> {
        self.bodies.iter().position(|b| b.bone_index == bone_index)
    }

    /// 以 `child_body` 为子端的关节
    pub fn joint_for_child(&self, child_body: usize) -> Option<&Joint> {
        self.joints.iter().find(|j| j.child_body == child_body)
    }

    /// 两刚体之间碰撞是否被禁用
    #[inline]
    pub fn is_collision_disabled(&self, a: usize, b: usize) -> bool {
        self.collision_disable.is_disabled(a, b)
    }

    /// 移除刚体及其关节和碰撞禁用项，之后的刚体索引前移一位
    ///
    /// 以被移除刚体为父端的子刚体失去父关节，成为顶层刚体。
    pub fn remove_body(&mut self, index: usize) -> Option<RetainedBody> {
        if index >= self.bodies.len() {
            return None;
        }
        let removed = self.bodies.remove(index);

        self.joints.retain(|j| j.child_body != index && j.parent_body != index);
        for joint in &mut self.joints {
            if joint.child_body > index {
                joint.child_body -= 1;
            }
            if joint.parent_body > index {
                joint.parent_body -= 1;
            }
        }
        self.collision_disable.remove_body(index);

        Some(removed)
    }

    /// 没有父关节的刚体（每棵连通树的顶层刚体）
    pub fn top_level_bodies(&self) -> Vec<usize> {
        (0..self.bodies.len())
            .filter(|&i| self.joint_for_child(i).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{AngularConstraintMode, AngularLimits, GeometryKind, Primitive};
    use crate::skeleton::BoneTransform;
    use glam::Vec3;

    fn body(bone: usize) -> RetainedBody {
        RetainedBody {
            bone_index: bone,
            bone_name: format!("b{bone}"),
            geometry_kind: GeometryKind::Sphere,
            local_frame: BoneTransform::IDENTITY,
            primitives: vec![Primitive::Sphere { radius: 1.0 }],
            merged_bones: Vec::new(),
            forced: false,
        }
    }

    fn joint(child: usize, parent: usize) -> Joint {
        Joint {
            child_bone: child,
            parent_bone: parent,
            child_body: child,
            parent_body: parent,
            child_frame: BoneTransform::IDENTITY,
            parent_frame: BoneTransform::from_translation(Vec3::Y),
            collision_enabled: false,
            angular: AngularLimits::from_mode(AngularConstraintMode::Limited, 45.0),
        }
    }

    /// 0 ← 1 ← 2，外加 0 ← 3
    fn asset() -> PhysicsAsset {
        let mut table = CollisionDisableTable::new();
        table.disable(0, 1);
        table.disable(1, 2);
        table.disable(0, 3);
        PhysicsAsset {
            bodies: (0..4).map(body).collect(),
            joints: vec![joint(1, 0), joint(2, 1), joint(3, 0)],
            collision_disable: table,
        }
    }

    #[test]
    fn test_queries() {
        let a = asset();
        assert_eq!(a.body_for_bone(2), Some(2));
        assert_eq!(a.joint_for_child(3).map(|j| j.parent_body), Some(0));
        assert!(a.is_collision_disabled(2, 1));
        assert_eq!(a.top_level_bodies(), vec![0]);
    }

    #[test]
    fn test_remove_body_remaps_everything() {
        let mut a = asset();
        let removed = a.remove_body(1).unwrap();
        assert_eq!(removed.bone_index, 1);

        assert_eq!(a.bodies.iter().map(|b| b.bone_index).collect::<Vec<_>>(), vec![0, 2, 3]);
        // 关节 1←0 与 2←1 随刚体 1 一起删除，3←0 重映射为 2←0
        assert_eq!(a.joints.len(), 1);
        assert_eq!((a.joints[0].child_body, a.joints[0].parent_body), (2, 0));
        assert_eq!(a.collision_disable.pairs(), vec![(0, 2)]);
        assert_eq!(a.top_level_bodies(), vec![0, 1]);

        assert!(a.remove_body(7).is_none());
    }
}
