//! 蒙皮三角形归属缓存
//!
//! 三角形只要有一个顶点受骨骼 B 影响，就归 B 所有。
//! 每骨骼的三角形列表按骨骼索引连续存放在一块 arena 中（骨骼索引本身就是稠密小整数）。
//! build 之后只读。

use std::collections::HashMap;

use glam::Vec3;

use super::vertex_collector::attributed_bones;
use crate::mesh::SkinnedMesh;
use crate::physics::VertexWeighting;
use crate::skeleton::Skeleton;

/// 按键分段存放的索引列表（CSR 布局）
#[derive(Clone, Debug, Default)]
struct IndexArena {
    offsets: Vec<usize>,
    items: Vec<u32>,
}

impl IndexArena {
    /// 从每键的列表构建
    fn from_lists(lists: &[Vec<u32>]) -> Self {
        let mut offsets = Vec::with_capacity(lists.len() + 1);
        let mut items = Vec::with_capacity(lists.iter().map(Vec::len).sum());
        offsets.push(0);
        for list in lists {
            items.extend_from_slice(list);
            offsets.push(items.len());
        }
        Self { offsets, items }
    }

    #[inline]
    fn get(&self, key: usize) -> &[u32] {
        match (self.offsets.get(key), self.offsets.get(key + 1)) {
            (Some(&start), Some(&end)) => &self.items[start..end],
            _ => &[],
        }
    }
}

/// 三角形归属缓存
pub struct TriangleOwnership<'a> {
    mesh: &'a SkinnedMesh,
    skeleton: &'a Skeleton,
    /// 顶点 → 影响它的骨骼
    vertex_bones: IndexArena,
    /// 骨骼 → 拥有的三角形
    bone_triangles: IndexArena,
}

impl<'a> TriangleOwnership<'a> {
    /// 构建缓存
    ///
    /// 顶点归属与 collect_bone_vertices 使用同一规则。
    pub fn build(mesh: &'a SkinnedMesh, skeleton: &'a Skeleton, weighting: VertexWeighting) -> Self {
        let bone_count = skeleton.len();

        let vertex_lists: Vec<Vec<u32>> = mesh
            .vertices
            .iter()
            .map(|v| {
                attributed_bones(v, weighting, bone_count)
                    .into_iter()
                    .map(|b| b as u32)
                    .collect()
            })
            .collect();
        let vertex_bones = IndexArena::from_lists(&vertex_lists);

        let mut triangle_lists: Vec<Vec<u32>> = vec![Vec::new(); bone_count];
        let mut tri_bones: Vec<u32> = Vec::with_capacity(12);
        for t in 0..mesh.triangle_count() {
            tri_bones.clear();
            for v in mesh.triangle(t) {
                for &b in vertex_bones.get(v) {
                    if !tri_bones.contains(&b) {
                        tri_bones.push(b);
                    }
                }
            }
            for &b in &tri_bones {
                triangle_lists[b as usize].push(t as u32);
            }
        }
        let bone_triangles = IndexArena::from_lists(&triangle_lists);

        Self { mesh, skeleton, vertex_bones, bone_triangles }
    }

    /// 骨骼是否影响顶点
    #[inline]
    pub fn influences(&self, bone: usize, vertex: usize) -> bool {
        self.vertex_bones.get(vertex).contains(&(bone as u32))
    }

    /// 骨骼拥有的三角形索引
    #[inline]
    pub fn owned_triangles(&self, bone: usize) -> &[u32] {
        self.bone_triangles.get(bone)
    }

    /// 单根骨骼的紧凑网格（骨骼局部空间）
    pub fn vertices_and_indices_for_bone(&self, bone: usize) -> (Vec<Vec3>, Vec<u32>) {
        self.vertices_and_indices_for_bones(bone, &[bone])
    }

    /// 多根骨骼拥有的三角形合并后的紧凑网格，转换到 `target` 骨骼局部空间
    ///
    /// 同一三角形被多根源骨骼拥有时只输出一次；顶点在三角形之间去重。
    /// 引用越界顶点的三角形跳过。
    pub fn vertices_and_indices_for_bones(&self, target: usize, sources: &[usize]) -> (Vec<Vec3>, Vec<u32>) {
        let mut triangles: Vec<u32> = sources
            .iter()
            .flat_map(|&b| self.owned_triangles(b).iter().copied())
            .collect();
        triangles.sort_unstable();
        triangles.dedup();

        let inv = self.skeleton.inverse_bind_matrix(target);
        let mut remap: HashMap<usize, u32> = HashMap::new();
        let mut positions = Vec::new();
        let mut indices = Vec::with_capacity(triangles.len() * 3);

        let vertex_count = self.mesh.vertices.len();
        let mut skipped = 0usize;

        for t in triangles {
            let corners = self.mesh.triangle(t as usize);
            if corners.iter().any(|&v| v >= vertex_count) {
                skipped += 1;
                continue;
            }
            for v in corners {
                let local = *remap.entry(v).or_insert_with(|| {
                    positions.push(inv.transform_point3(self.mesh.vertices[v].position));
                    (positions.len() - 1) as u32
                });
                indices.push(local);
            }
        }

        if skipped > 0 {
            log::warn!(
                "[PhysGen] 骨骼 {} 的凸分解输入跳过 {} 个引用越界顶点的三角形",
                target,
                skipped
            );
        }

        (positions, indices)
    }
}
