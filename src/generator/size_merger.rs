//! 骨骼尺寸合并
//!
//! 从叶到根（索引降序，子骨骼索引总是大于父骨骼）处理：
//! - 尺寸 ≥ min_bone_size：保留
//! - min_weld_size ≤ 尺寸 < min_bone_size：顶点转换到父骨骼空间并入父骨骼
//! - 尺寸 < min_weld_size：数据直接丢弃
//!
//! 累计尺寸初始为骨骼自身顶点在网格（绑定）空间下包围盒的对角线长度；
//! 骨骼并入父骨骼时，父骨骼的累计尺寸加上该骨骼的累计尺寸。
//! 对合并结果再跑一遍时用 merge_small_bones_seeded 带上上一轮的累计尺寸，不会产生新的合并。
//!
//! 强制根：一棵骨骼树里出现多个顶层保留骨骼时，把它们的最近公共祖先强制保留并重跑，
//! 直到每棵树至多一个顶层刚体。

use super::vertex_collector::BoneVertInfo;
use crate::physics::GenerationParams;
use crate::skeleton::Skeleton;

/// 合并参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    pub min_bone_size: f32,
    pub min_weld_size: f32,
    pub body_for_all: bool,
    pub walk_past_small: bool,
}

impl From<&GenerationParams> for MergeParams {
    fn from(p: &GenerationParams) -> Self {
        Self {
            min_bone_size: p.min_bone_size,
            min_weld_size: p.min_weld_size,
            body_for_all: p.body_for_all,
            walk_past_small: p.walk_past_small,
        }
    }
}

/// 合并结果（所有数组按骨骼索引寻址）
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    /// 合并后的工作集；未保留骨骼为空
    pub infos: Vec<BoneVertInfo>,
    /// 保留的骨骼（升序）
    pub retained: Vec<usize>,
    /// 每根骨骼的累计尺寸（自身对角线 + 并入骨骼的累计尺寸）
    pub sizes: Vec<f32>,
    /// 直接并入的目标骨骼
    pub merged_into: Vec<Option<usize>>,
    /// 传递性并入本骨骼的所有骨骼
    pub merged_bones: Vec<Vec<usize>>,
    /// 被强制保留的骨骼
    pub forced: Vec<bool>,
    /// 数据被丢弃的骨骼
    pub dropped: Vec<usize>,
}

impl MergeResult {
    #[inline]
    pub fn is_retained(&self, bone: usize) -> bool {
        self.retained.binary_search(&bone).is_ok()
    }

    /// 没有保留祖先的保留骨骼
    pub fn top_level(&self, skeleton: &Skeleton) -> Vec<usize> {
        self.retained
            .iter()
            .copied()
            .filter(|&b| !skeleton.ancestors(b).any(|a| self.is_retained(a)))
            .collect()
    }
}

/// 执行合并（含强制根）
pub fn merge_small_bones(skeleton: &Skeleton, infos: &[BoneVertInfo], params: &MergeParams) -> MergeResult {
    merge_small_bones_seeded(skeleton, infos, &[], params)
}

/// 带初始累计尺寸的合并
///
/// 非空骨骼的初始尺寸取自身对角线与 `seed_sizes[b]` 的较大者；空集骨骼从 0 开始。
/// 传入上一轮的 `infos` 和 `sizes` 即可在合并结果上重跑。
pub fn merge_small_bones_seeded(
    skeleton: &Skeleton,
    infos: &[BoneVertInfo],
    seed_sizes: &[f32],
    params: &MergeParams,
) -> MergeResult {
    let mut forced = vec![false; skeleton.len()];

    loop {
        let result = run_pass(skeleton, infos, seed_sizes, params, &forced);
        let new_roots = forced_roots(skeleton, &result);
        if new_roots.is_empty() {
            return result;
        }
        for root in new_roots {
            log::debug!(
                "[PhysGen] 强制保留骨骼 '{}' 作为公共根",
                skeleton.bones()[root].name
            );
            forced[root] = true;
        }
    }
}

/// 单遍合并
fn run_pass(
    skeleton: &Skeleton,
    infos: &[BoneVertInfo],
    seed_sizes: &[f32],
    params: &MergeParams,
    forced: &[bool],
) -> MergeResult {
    let n = skeleton.len();
    // 工作数组一次性按骨骼数分配
    let mut work: Vec<BoneVertInfo> = (0..n).map(|i| infos.get(i).cloned().unwrap_or_default()).collect();
    let mut sizes: Vec<f32> = (0..n)
        .map(|b| {
            if work[b].is_empty() {
                return 0.0;
            }
            let own = extent_in_mesh_space(&work[b], skeleton, b);
            seed_sizes.get(b).map_or(own, |&seed| own.max(seed))
        })
        .collect();
    let mut merged_into = vec![None; n];
    let mut merged_bones: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut retained_mask = vec![false; n];
    let mut dropped = Vec::new();

    for b in (0..n).rev() {
        let size = sizes[b];

        if params.body_for_all || forced[b] || size >= params.min_bone_size {
            retained_mask[b] = true;
            continue;
        }

        match skeleton.parent_of(b) {
            Some(p) if params.walk_past_small && size >= params.min_weld_size => {
                let taken = std::mem::take(&mut work[b]);
                work[p].append_transformed(&taken, skeleton.relative_transform(b, p));
                sizes[p] += size;
                let carried = std::mem::take(&mut merged_bones[b]);
                merged_bones[p].push(b);
                merged_bones[p].extend(carried);
                merged_into[b] = Some(p);
            }
            _ => {
                // 可忽略的几何（或根骨骼无处可并）：丢弃
                if !work[b].is_empty() || !merged_bones[b].is_empty() {
                    dropped.push(b);
                }
                work[b].clear();
                merged_bones[b].clear();
            }
        }
    }

    let retained: Vec<usize> = (0..n).filter(|&b| retained_mask[b]).collect();
    let forced = forced.to_vec();
    dropped.reverse();

    MergeResult { infos: work, retained, sizes, merged_into, merged_bones, forced, dropped }
}

/// 每棵骨骼树中顶层保留骨骼多于一个时，它们的最近公共祖先
fn forced_roots(skeleton: &Skeleton, result: &MergeResult) -> Vec<usize> {
    let top = result.top_level(skeleton);
    let mut out = Vec::new();

    for &root in skeleton.roots() {
        let mut in_tree = top.iter().copied().filter(|&b| skeleton.root_of(b) == root);
        let Some(first) = in_tree.next() else {
            continue;
        };
        let mut lca = first;
        let mut count = 1;
        for b in in_tree {
            count += 1;
            if let Some(a) = skeleton.common_ancestor(lca, b) {
                lca = a;
            }
        }
        if count > 1 && !result.is_retained(lca) {
            out.push(lca);
        }
    }
    out
}

/// 网格空间包围盒对角线
fn extent_in_mesh_space(info: &BoneVertInfo, skeleton: &Skeleton, bone: usize) -> f32 {
    let bind = skeleton.bind_matrix(bone);
    let mut iter = info.positions.iter().map(|p| bind.transform_point3(*p));
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (lo, hi) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
    (hi - lo).length()
}
