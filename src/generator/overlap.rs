//! 绑定姿态重叠消解
//!
//! 所有刚体按绑定姿态放入临时世界，两两检测（已禁用的对跳过），
//! 重叠的刚体对加入碰撞禁用表。临时世界在本次调用内创建和销毁。

use crate::physics::{CollisionDisableTable, RapierScratchWorld, RetainedBody, ScratchWorld};
use crate::skeleton::Skeleton;

/// 使用默认的 Rapier 临时世界消解重叠，返回新增的禁用对数
pub fn resolve_overlaps(skeleton: &Skeleton, bodies: &[RetainedBody], table: &mut CollisionDisableTable) -> usize {
    let mut world = RapierScratchWorld::new();
    resolve_with(&mut world, skeleton, bodies, table)
}

/// 在给定临时世界中消解重叠
pub fn resolve_with<W: ScratchWorld>(
    world: &mut W,
    skeleton: &Skeleton,
    bodies: &[RetainedBody],
    table: &mut CollisionDisableTable,
) -> usize {
    let mut placed = vec![false; bodies.len()];
    for (i, body) in bodies.iter().enumerate() {
        placed[i] = world.add_body(i, body, skeleton.bind_matrix(body.bone_index));
        if !placed[i] {
            log::warn!("[PhysGen] 刚体 '{}' 无法放入临时世界，不参与重叠检测", body.bone_name);
        }
    }

    let mut added = 0;
    for a in 0..bodies.len() {
        if !placed[a] {
            continue;
        }
        for b in (a + 1)..bodies.len() {
            if !placed[b] || table.is_disabled(a, b) {
                continue;
            }
            if world.overlaps(a, b) && table.disable(a, b) {
                log::debug!(
                    "[PhysGen] 绑定姿态重叠，禁用碰撞: '{}' <-> '{}'",
                    bodies[a].bone_name,
                    bodies[b].bone_name
                );
                added += 1;
            }
        }
    }

    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{GeometryKind, Primitive};
    use crate::skeleton::{BoneLink, BoneTransform};
    use glam::{Mat4, Vec3};

    fn body(bone: usize, half: f32) -> RetainedBody {
        RetainedBody {
            bone_index: bone,
            bone_name: format!("b{bone}"),
            geometry_kind: GeometryKind::Box,
            local_frame: BoneTransform::IDENTITY,
            primitives: vec![Primitive::Box { half_extents: Vec3::splat(half) }],
            merged_bones: Vec::new(),
            forced: false,
        }
    }

    /// 三根并列骨骼，x = 0 / 1.5 / 10
    fn skeleton() -> Skeleton {
        Skeleton::new(vec![
            BoneLink::new("a", None, BoneTransform::IDENTITY),
            BoneLink::new("b", Some(0), BoneTransform::from_translation(Vec3::new(1.5, 0.0, 0.0))),
            BoneLink::new("c", Some(0), BoneTransform::from_translation(Vec3::new(10.0, 0.0, 0.0))),
        ])
        .unwrap()
    }

    #[test]
    fn test_disables_only_overlapping_pairs() {
        let s = skeleton();
        let bodies = vec![body(0, 1.0), body(1, 1.0), body(2, 1.0)];
        let mut table = CollisionDisableTable::new();
        assert_eq!(resolve_overlaps(&s, &bodies, &mut table), 1);
        assert_eq!(table.pairs(), vec![(0, 1)]);
    }

    #[test]
    fn test_existing_pairs_not_counted() {
        let s = skeleton();
        let bodies = vec![body(0, 1.0), body(1, 1.0), body(2, 1.0)];
        let mut table = CollisionDisableTable::new();
        table.disable(1, 0);
        assert_eq!(resolve_overlaps(&s, &bodies, &mut table), 0);
        assert_eq!(table.len(), 1);
    }

    /// 记录查询次数的假世界
    #[derive(Default)]
    struct CountingWorld {
        queries: std::cell::Cell<usize>,
    }

    impl ScratchWorld for CountingWorld {
        fn add_body(&mut self, body_index: usize, _: &RetainedBody, _: Mat4) -> bool {
            body_index != 2
        }

        fn overlaps(&self, _: usize, _: usize) -> bool {
            self.queries.set(self.queries.get() + 1);
            true
        }
    }

    #[test]
    fn test_unplaced_bodies_are_skipped() {
        let s = skeleton();
        let bodies = vec![body(0, 1.0), body(1, 1.0), body(2, 1.0)];
        let mut table = CollisionDisableTable::new();
        let mut world = CountingWorld::default();
        assert_eq!(resolve_with(&mut world, &s, &bodies, &mut table), 1);
        assert_eq!(world.queries.get(), 1);
        assert!(!table.is_disabled(0, 2));
    }
}
