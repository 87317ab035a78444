//! 物理资产生成流水线
//!
//! 一次性批处理：顶点收集 → 尺寸合并 → 逐骨骼拟合 → 关节 → 重叠消解。
//! 生成器本身不保留任何运行间状态，每次 generate 都从输入重新计算。
//! regenerate_bodies 对已有资产中的部分刚体重新拟合，不重跑合并和关节。

use rayon::prelude::*;

use super::decompose::{ConvexDecomposer, VhacdDecomposer};
use super::geometry_fitter::{BodyGeometryFitter, FitOptions};
use super::joint_synth::synthesize;
use super::overlap::resolve_overlaps;
use super::size_merger::{merge_small_bones, MergeParams, MergeResult};
use super::triangle_cache::TriangleOwnership;
use super::vertex_collector::{collect_bone_vertices, BoneVertInfo};
use crate::mesh::SkinnedMesh;
use crate::physics::{
    get_config, AngularLimits, CollisionDisableTable, GenerationParams, GeometryKind, PhysicsAsset,
    RetainedBody,
};
use crate::skeleton::Skeleton;
use crate::{PhysGenError, Result};

/// 逐骨骼拟合进度
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProgress {
    pub bone_index: usize,
    pub bone_name: String,
    /// 从 1 开始
    pub current: usize,
    pub total: usize,
}

type ProgressCallback = Box<dyn FnMut(&GenerationProgress)>;

/// 物理资产生成器
///
/// ```ignore
/// let asset = PhysicsAssetGenerator::new()
///     .with_progress(|p| log::info!("{}/{} {}", p.current, p.total, p.bone_name))
///     .generate(&mesh, &skeleton)?;
/// ```
pub struct PhysicsAssetGenerator {
    params: GenerationParams,
    /// None 时按 max_convex_hulls 使用 VHACD
    decomposer: Option<Box<dyn ConvexDecomposer>>,
    on_progress: Option<ProgressCallback>,
}

impl Default for PhysicsAssetGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsAssetGenerator {
    /// 以当前全局配置创建
    pub fn new() -> Self {
        Self::with_params(get_config())
    }

    pub fn with_params(params: GenerationParams) -> Self {
        Self { params, decomposer: None, on_progress: None }
    }

    /// 替换凸分解实现
    pub fn with_decomposer(mut self, decomposer: Box<dyn ConvexDecomposer>) -> Self {
        self.decomposer = Some(decomposer);
        self
    }

    /// 设置进度回调（每根骨骼拟合前调用）
    pub fn with_progress(mut self, callback: impl FnMut(&GenerationProgress) + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// 生成物理资产
    pub fn generate(&mut self, mesh: &SkinnedMesh, skeleton: &Skeleton) -> Result<PhysicsAsset> {
        mesh.validate()?;
        let params = &self.params;

        // ====== 顶点收集 + 尺寸合并 ======
        let infos = collect_bone_vertices(mesh, skeleton, params.vertex_weight);
        let mut merge_params = MergeParams::from(params);
        let mut merged = merge_small_bones(skeleton, &infos, &merge_params);

        if merged.retained.is_empty() {
            if let Some(retry) = params.retry_min_bone_size.filter(|&r| r < merge_params.min_bone_size) {
                log::warn!(
                    "[PhysGen] min_bone_size={} 时没有任何刚体，改用 {} 重试",
                    merge_params.min_bone_size,
                    retry
                );
                merge_params.min_bone_size = retry;
                merged = merge_small_bones(skeleton, &infos, &merge_params);
            }
        }
        if merged.retained.is_empty() {
            return Err(PhysGenError::NoBodiesGenerated { min_bone_size: merge_params.min_bone_size });
        }
        if params.debug_log {
            log::debug!(
                "[PhysGen] 合并完成: 保留 {} 根骨骼, 丢弃 {} 根",
                merged.retained.len(),
                merged.dropped.len()
            );
        }

        // ====== 逐骨骼拟合 ======
        let kind = params.geometry_kind;
        let triangles = (kind == GeometryKind::MultiHull)
            .then(|| TriangleOwnership::build(mesh, skeleton, params.vertex_weight));
        let default_decomposer = VhacdDecomposer::new(params.max_convex_hulls);
        let decomposer: &dyn ConvexDecomposer = match &self.decomposer {
            Some(d) => d.as_ref(),
            None => &default_decomposer,
        };
        let mut fitter = BodyGeometryFitter::new(skeleton, FitOptions::from(params));
        if let Some(t) = &triangles {
            fitter = fitter.with_decomposition(t, decomposer);
        }

        let total = merged.retained.len();
        let fitted: Vec<Option<RetainedBody>> = if params.parallel_fitting {
            let fitted: Vec<Option<RetainedBody>> = merged
                .retained
                .par_iter()
                .map(|&bone| fit_bone(&fitter, skeleton, &merged, bone, kind))
                .collect();
            // 并行时按顺序补报进度
            if let Some(callback) = self.on_progress.as_mut() {
                for (i, &bone) in merged.retained.iter().enumerate() {
                    callback(&progress(skeleton, bone, i, total));
                }
            }
            fitted
        } else {
            merged
                .retained
                .iter()
                .enumerate()
                .map(|(i, &bone)| {
                    if let Some(callback) = self.on_progress.as_mut() {
                        callback(&progress(skeleton, bone, i, total));
                    }
                    fit_bone(&fitter, skeleton, &merged, bone, kind)
                })
                .collect()
        };
        let bodies: Vec<RetainedBody> = fitted.into_iter().flatten().collect();
        if bodies.is_empty() {
            return Err(PhysGenError::NoBodiesGenerated { min_bone_size: merge_params.min_bone_size });
        }

        // ====== 关节 ======
        let mut table = CollisionDisableTable::new();
        let joints = if params.create_joints {
            let angular = AngularLimits::from_mode(params.angular_constraint_mode, params.angular_limit_degrees);
            synthesize(skeleton, &bodies, angular, &mut table)
        } else {
            Vec::new()
        };

        // ====== 重叠消解 ======
        let overlap_pairs = if params.disable_overlapping_collisions {
            resolve_overlaps(skeleton, &bodies, &mut table)
        } else {
            0
        };

        log::info!(
            "[PhysGen] 物理资产生成完成: 刚体={}, 关节={}, 禁用碰撞对={} (重叠 {})",
            bodies.len(),
            joints.len(),
            table.len(),
            overlap_pairs
        );

        Ok(PhysicsAsset { bodies, joints, collision_disable: table })
    }

    /// 按当前参数重新拟合指定骨骼的刚体，返回成功重拟合的数量
    ///
    /// 刚体保留原有的并入骨骼列表和强制标记；拟合失败的刚体连同其关节、
    /// 碰撞禁用项一起从资产中移除，其后的刚体索引前移。没有刚体的骨骼被忽略。
    pub fn regenerate_bodies(
        &mut self,
        asset: &mut PhysicsAsset,
        mesh: &SkinnedMesh,
        skeleton: &Skeleton,
        bones: &[usize],
    ) -> Result<usize> {
        mesh.validate()?;
        let params = &self.params;
        let kind = params.geometry_kind;

        let mut targets: Vec<(usize, usize)> = Vec::with_capacity(bones.len());
        for &bone in bones {
            match asset.body_for_bone(bone) {
                Some(index) if !targets.iter().any(|&(b, _)| b == bone) => targets.push((bone, index)),
                Some(_) => {}
                None => log::warn!("[PhysGen] 骨骼 {} 没有刚体，跳过重新生成", bone),
            }
        }
        if targets.is_empty() {
            return Ok(0);
        }

        let infos = collect_bone_vertices(mesh, skeleton, params.vertex_weight);
        let triangles = (kind == GeometryKind::MultiHull)
            .then(|| TriangleOwnership::build(mesh, skeleton, params.vertex_weight));
        let default_decomposer = VhacdDecomposer::new(params.max_convex_hulls);
        let decomposer: &dyn ConvexDecomposer = match &self.decomposer {
            Some(d) => d.as_ref(),
            None => &default_decomposer,
        };
        let mut fitter = BodyGeometryFitter::new(skeleton, FitOptions::from(params));
        if let Some(t) = &triangles {
            fitter = fitter.with_decomposition(t, decomposer);
        }

        let total = targets.len();
        let mut failed = Vec::new();
        for (i, &(bone, index)) in targets.iter().enumerate() {
            if let Some(callback) = self.on_progress.as_mut() {
                callback(&progress(skeleton, bone, i, total));
            }

            let merged_bones = asset.bodies[index].merged_bones.clone();
            let info = gather_merged(skeleton, &infos, bone, &merged_bones);
            match fitter.fit(bone, &info, &merged_bones, kind) {
                Ok(mut body) => {
                    body.forced = asset.bodies[index].forced;
                    asset.bodies[index] = body;
                }
                Err(err) => {
                    log::warn!("[PhysGen] 骨骼 {} 重新生成失败 ({})，移除刚体", bone, err);
                    failed.push(index);
                }
            }
        }

        // 从大到小移除，保证尚未处理的索引不变
        failed.sort_unstable_by(|a, b| b.cmp(a));
        for &index in &failed {
            asset.remove_body(index);
        }

        log::info!(
            "[PhysGen] 重新生成刚体: 成功={}, 移除={}, 剩余刚体={}",
            total - failed.len(),
            failed.len(),
            asset.bodies.len()
        );
        Ok(total - failed.len())
    }
}

/// 骨骼自身顶点加上并入骨骼的顶点（转换到该骨骼局部空间）
fn gather_merged(skeleton: &Skeleton, infos: &[BoneVertInfo], bone: usize, merged_bones: &[usize]) -> BoneVertInfo {
    let mut info = infos.get(bone).cloned().unwrap_or_default();
    for &m in merged_bones {
        if let Some(other) = infos.get(m) {
            info.append_transformed(other, skeleton.relative_transform(m, bone));
        }
    }
    info
}

fn progress(skeleton: &Skeleton, bone: usize, i: usize, total: usize) -> GenerationProgress {
    GenerationProgress {
        bone_index: bone,
        bone_name: skeleton.get(bone).map(|b| b.name.clone()).unwrap_or_default(),
        current: i + 1,
        total,
    }
}

/// 拟合单根保留骨骼；失败时跳过该骨骼
///
/// 顶层或强制保留的骨骼不能丢（会把骨架断成多棵树），凸包失败时退化为盒体。
fn fit_bone(
    fitter: &BodyGeometryFitter<'_>,
    skeleton: &Skeleton,
    merged: &MergeResult,
    bone: usize,
    kind: GeometryKind,
) -> Option<RetainedBody> {
    let info = &merged.infos[bone];
    let merged_bones = &merged.merged_bones[bone];
    let forced = merged.forced[bone];
    let name = skeleton.get(bone).map_or("", |b| b.name.as_str());

    let result = match fitter.fit(bone, info, merged_bones, kind) {
        Err(err) if kind.requires_vertices() && (forced || is_top_level(skeleton, merged, bone)) => {
            log::warn!("[PhysGen] 骨骼 '{}' 凸包生成失败 ({})，退化为盒体", name, err);
            fitter.fit(bone, info, merged_bones, GeometryKind::Box)
        }
        other => other,
    };

    match result {
        Ok(mut body) => {
            body.forced = forced;
            Some(body)
        }
        Err(err) => {
            log::warn!("[PhysGen] 跳过骨骼 '{}': {}", name, err);
            None
        }
    }
}

fn is_top_level(skeleton: &Skeleton, merged: &MergeResult, bone: usize) -> bool {
    !skeleton.ancestors(bone).any(|a| merged.is_retained(a))
}
