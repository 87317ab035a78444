//! 关节生成
//!
//! 每个刚体沿父链向上找到第一个带刚体的骨骼，生成连接两者的关节，
//! 并在碰撞禁用表中登记这对刚体。

use crate::physics::{AngularLimits, CollisionDisableTable, Joint, RetainedBody};
use crate::skeleton::{BoneTransform, Skeleton};

/// 骨骼索引 → 刚体索引
pub fn body_lookup(skeleton: &Skeleton, bodies: &[RetainedBody]) -> Vec<Option<usize>> {
    let mut lookup = vec![None; skeleton.len()];
    for (i, body) in bodies.iter().enumerate() {
        if let Some(slot) = lookup.get_mut(body.bone_index) {
            *slot = Some(i);
        }
    }
    lookup
}

/// 生成关节，返回顺序与 `bodies` 一致（没有保留祖先的刚体跳过）
pub fn synthesize(
    skeleton: &Skeleton,
    bodies: &[RetainedBody],
    angular: AngularLimits,
    table: &mut CollisionDisableTable,
) -> Vec<Joint> {
    let lookup = body_lookup(skeleton, bodies);
    let mut joints = Vec::with_capacity(bodies.len());

    for (child_body, body) in bodies.iter().enumerate() {
        let child_bone = body.bone_index;
        let Some((parent_bone, parent_body)) = skeleton
            .ancestors(child_bone)
            .find_map(|a| lookup[a].map(|b| (a, b)))
        else {
            continue;
        };

        table.disable(child_body, parent_body);
        joints.push(Joint {
            child_bone,
            parent_bone,
            child_body,
            parent_body,
            child_frame: BoneTransform::IDENTITY,
            parent_frame: BoneTransform::from_matrix(skeleton.relative_transform(child_bone, parent_bone)),
            collision_enabled: false,
            angular,
        });
    }

    joints
}
