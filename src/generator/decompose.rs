//! 凸分解（外部能力，以 trait 对象注入）
//!
//! 默认实现使用 parry 的 VHACD（经 rapier3d 重新导出）。

use glam::Vec3;
use rapier3d::parry::transformation::vhacd::{VHACDParameters, VHACD};
use rapier3d::prelude::*;

use crate::physics::ConvexHull;

/// 凸分解能力：对固定输入必须是确定的
pub trait ConvexDecomposer: Send + Sync {
    /// 把三角网格分解为若干凸包；退化区域可以返回空列表
    fn decompose(
        &self,
        vertices: &[Vec3],
        indices: &[u32],
        accuracy: f32,
        max_verts_per_hull: usize,
    ) -> Vec<ConvexHull>;
}

/// VHACD 体素分辨率范围（沿最长轴的体素数）
const MIN_RESOLUTION: f32 = 16.0;
const MAX_RESOLUTION: f32 = 128.0;

/// 凸包顶点数下限（四面体）
const MIN_HULL_VERTS: usize = 4;

/// 基于 parry VHACD 的凸分解
#[derive(Debug, Clone)]
pub struct VhacdDecomposer {
    /// 最多凸包数
    pub max_convex_hulls: u32,
}

impl Default for VhacdDecomposer {
    fn default() -> Self {
        Self { max_convex_hulls: 8 }
    }
}

impl VhacdDecomposer {
    pub fn new(max_convex_hulls: u32) -> Self {
        Self { max_convex_hulls: max_convex_hulls.max(1) }
    }

    /// 精度 [0, 1] → VHACD 参数
    fn parameters(&self, accuracy: f32) -> VHACDParameters {
        let a = accuracy.clamp(0.0, 1.0);
        VHACDParameters {
            resolution: (MIN_RESOLUTION + (MAX_RESOLUTION - MIN_RESOLUTION) * a).round() as u32,
            // 精度越高允许的凹度越小
            concavity: 0.1 + (0.001 - 0.1) * a,
            ..VHACDParameters::default()
        }
    }
}

impl ConvexDecomposer for VhacdDecomposer {
    fn decompose(
        &self,
        vertices: &[Vec3],
        indices: &[u32],
        accuracy: f32,
        max_verts_per_hull: usize,
    ) -> Vec<ConvexHull> {
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .filter(|t| t.iter().all(|&i| (i as usize) < vertices.len()))
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        if triangles.is_empty() {
            return Vec::new();
        }

        let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y, v.z]).collect();
        let params = self.parameters(accuracy);
        let decomposition = VHACD::decompose(&params, &points, &triangles, false);

        let mut hulls: Vec<ConvexHull> = decomposition
            .compute_convex_hulls(params.convex_hull_downsampling)
            .into_iter()
            .filter(|(hull_points, _)| !hull_points.is_empty())
            .map(|(hull_points, _)| {
                let verts: Vec<Vec3> = hull_points.iter().map(|p| Vec3::new(p.x, p.y, p.z)).collect();
                ConvexHull::new(limit_hull_vertices(verts, max_verts_per_hull))
            })
            .collect();
        keep_largest_hulls(&mut hulls, self.max_convex_hulls as usize);
        hulls
    }
}

/// 凸包数超过上限时按包围盒体积保留最大的几个（稳定排序，保证确定性）
pub fn keep_largest_hulls(hulls: &mut Vec<ConvexHull>, max_hulls: usize) {
    if hulls.len() <= max_hulls {
        return;
    }
    let volume = |h: &ConvexHull| {
        h.bounds().map_or(0.0, |(lo, hi)| {
            let d = hi - lo;
            d.x * d.y * d.z
        })
    };
    hulls.sort_by(|a, b| volume(b).total_cmp(&volume(a)));
    hulls.truncate(max_hulls.max(1));
}

/// 最远点采样，把顶点数压到 `max_verts` 以内（不少于 4）
pub fn limit_hull_vertices(vertices: Vec<Vec3>, max_verts: usize) -> Vec<Vec3> {
    let budget = max_verts.max(MIN_HULL_VERTS);
    if vertices.len() <= budget {
        return vertices;
    }

    let centroid = vertices.iter().copied().sum::<Vec3>() / vertices.len() as f32;
    let first = vertices
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.distance_squared(centroid).total_cmp(&b.1.distance_squared(centroid)))
        .map_or(0, |(i, _)| i);

    let mut chosen = Vec::with_capacity(budget);
    let mut min_dist: Vec<f32> = vertices.iter().map(|v| v.distance_squared(vertices[first])).collect();
    chosen.push(vertices[first]);

    while chosen.len() < budget {
        let Some((next, _)) = min_dist
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
        else {
            break;
        };
        if min_dist[next] <= 0.0 {
            break;
        }
        let picked = vertices[next];
        chosen.push(picked);
        for (d, v) in min_dist.iter_mut().zip(&vertices) {
            *d = d.min(v.distance_squared(picked));
        }
    }

    chosen
}
