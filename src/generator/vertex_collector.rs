//! 骨骼顶点收集
//!
//! 按权重规则把每个蒙皮顶点归属到一个或多个骨骼，
//! 顶点位置/法线转换到所属骨骼的绑定局部空间。

use glam::{Mat4, Vec3};

use crate::mesh::{SkinnedMesh, SkinnedVertex};
use crate::physics::VertexWeighting;
use crate::skeleton::Skeleton;

/// AnyWeight 规则下的最小非零权重（8 位蒙皮权重能表示的最小值）
pub const MIN_INFLUENCE_WEIGHT: f32 = 1.0 / 255.0;

/// 单根骨骼的顶点集合（骨骼局部空间）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoneVertInfo {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl BoneVertInfo {
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn push(&mut self, position: Vec3, normal: Vec3) {
        self.positions.push(position);
        self.normals.push(normal);
    }

    /// 包围盒 (min, max)
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(self.positions.iter().fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))))
    }

    /// 空间尺寸：包围盒对角线长度（空集为 0）
    pub fn extent(&self) -> f32 {
        self.bounds().map_or(0.0, |(lo, hi)| (hi - lo).length())
    }

    /// 经过 `transform` 后追加另一集合
    pub fn append_transformed(&mut self, other: &BoneVertInfo, transform: Mat4) {
        self.positions.reserve(other.len());
        self.normals.reserve(other.len());
        for (p, n) in other.positions.iter().zip(&other.normals) {
            self.positions.push(transform.transform_point3(*p));
            self.normals.push(transform.transform_vector3(*n).normalize_or_zero());
        }
    }

    /// 清空（保留容量）
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
    }
}

/// 按规则列出顶点归属的骨骼（去重，保持影响列表顺序）
///
/// 越界骨骼索引会被跳过。
pub fn attributed_bones(vertex: &SkinnedVertex, weighting: VertexWeighting, bone_count: usize) -> Vec<usize> {
    let valid = vertex.influences.iter().filter(|inf| inf.bone < bone_count);

    let candidates: Vec<usize> = match weighting {
        VertexWeighting::DominantWeight => {
            let max = valid.clone().map(|inf| inf.weight).fold(0.0_f32, f32::max);
            if max <= 0.0 {
                return Vec::new();
            }
            valid
                .filter(|inf| (inf.weight - max).abs() <= f32::EPSILON)
                .map(|inf| inf.bone)
                .collect()
        }
        VertexWeighting::AnyWeight => valid
            .filter(|inf| inf.weight >= MIN_INFLUENCE_WEIGHT)
            .map(|inf| inf.bone)
            .collect(),
    };

    let mut out = Vec::with_capacity(candidates.len());
    for bone in candidates {
        if !out.contains(&bone) {
            out.push(bone);
        }
    }
    out
}

/// 收集所有骨骼的顶点集合
///
/// 返回长度等于骨骼数；没有顶点归属的骨骼得到空集合。
pub fn collect_bone_vertices(
    mesh: &SkinnedMesh,
    skeleton: &Skeleton,
    weighting: VertexWeighting,
) -> Vec<BoneVertInfo> {
    let bone_count = skeleton.len();
    let mut infos = vec![BoneVertInfo::default(); bone_count];
    let mut out_of_range = 0usize;

    for vertex in &mesh.vertices {
        out_of_range += vertex.influences.iter().filter(|inf| inf.bone >= bone_count).count();
        for bone in attributed_bones(vertex, weighting, bone_count) {
            let inv = skeleton.inverse_bind_matrix(bone);
            infos[bone].push(
                inv.transform_point3(vertex.position),
                inv.transform_vector3(vertex.normal).normalize_or_zero(),
            );
        }
    }

    if out_of_range > 0 {
        log::warn!("[PhysGen] 忽略了 {} 个指向不存在骨骼的顶点影响", out_of_range);
    }

    infos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::BoneInfluence;
    use crate::skeleton::{BoneLink, BoneTransform};

    fn two_bones() -> Skeleton {
        Skeleton::new(vec![
            BoneLink::new("root", None, BoneTransform::IDENTITY),
            BoneLink::new("child", Some(0), BoneTransform::from_translation(Vec3::new(0.0, 10.0, 0.0))),
        ])
        .unwrap()
    }

    fn vertex(pos: Vec3, influences: &[(usize, f32)]) -> SkinnedVertex {
        SkinnedVertex::new(
            pos,
            Vec3::Y,
            influences.iter().map(|&(b, w)| BoneInfluence::new(b, w)).collect(),
        )
    }

    #[test]
    fn test_dominant_picks_max() {
        let v = vertex(Vec3::ZERO, &[(0, 0.3), (1, 0.7)]);
        assert_eq!(attributed_bones(&v, VertexWeighting::DominantWeight, 2), vec![1]);
    }

    #[test]
    fn test_dominant_ties_go_to_all() {
        let v = vertex(Vec3::ZERO, &[(0, 0.5), (1, 0.5)]);
        assert_eq!(attributed_bones(&v, VertexWeighting::DominantWeight, 2), vec![0, 1]);
    }

    #[test]
    fn test_any_weight_threshold() {
        let v = vertex(Vec3::ZERO, &[(0, 0.001), (1, 0.999)]);
        assert_eq!(attributed_bones(&v, VertexWeighting::AnyWeight, 2), vec![1]);
        let v = vertex(Vec3::ZERO, &[(0, 0.2), (1, 0.8)]);
        assert_eq!(attributed_bones(&v, VertexWeighting::AnyWeight, 2), vec![0, 1]);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let v = vertex(Vec3::ZERO, &[(7, 0.9), (0, 0.1)]);
        assert_eq!(attributed_bones(&v, VertexWeighting::DominantWeight, 2), vec![0]);
    }

    #[test]
    fn test_collect_into_bone_space() {
        let skeleton = two_bones();
        let mesh = SkinnedMesh::new(
            vec![
                vertex(Vec3::new(1.0, 11.0, 0.0), &[(1, 1.0)]),
                vertex(Vec3::new(0.0, 1.0, 0.0), &[(0, 1.0)]),
            ],
            vec![0, 1, 1],
        );
        let infos = collect_bone_vertices(&mesh, &skeleton, VertexWeighting::DominantWeight);
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].len(), 1);
        assert!(infos[1].positions[0].abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(infos[0].positions[0].abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_extent_is_diagonal() {
        let mut info = BoneVertInfo::default();
        info.push(Vec3::ZERO, Vec3::Y);
        info.push(Vec3::new(3.0, 4.0, 0.0), Vec3::Y);
        assert!((info.extent() - 5.0).abs() < 1e-5);
        assert_eq!(BoneVertInfo::default().extent(), 0.0);
    }
}
