//! 碰撞禁用表
//!
//! 键统一为 (min, max)，(a, b) 与 (b, a) 总是命中同一项。

use std::collections::HashSet;

/// 碰撞禁用表（刚体索引对）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionDisableTable {
    pairs: HashSet<(usize, usize)>,
}

impl CollisionDisableTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn key(a: usize, b: usize) -> (usize, usize) {
        (a.min(b), a.max(b))
    }

    /// 禁用一对刚体之间的碰撞；新加入时返回 true
    pub fn disable(&mut self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        self.pairs.insert(Self::key(a, b))
    }

    /// 重新启用
    pub fn enable(&mut self, a: usize, b: usize) -> bool {
        self.pairs.remove(&Self::key(a, b))
    }

    #[inline]
    pub fn is_disabled(&self, a: usize, b: usize) -> bool {
        self.pairs.contains(&Self::key(a, b))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// 刚体被移除：删去含 `index` 的键，更高的索引整体前移一位
    pub fn remove_body(&mut self, index: usize) {
        let shift = |i: usize| if i > index { i - 1 } else { i };
        self.pairs = self
            .pairs
            .iter()
            .filter(|&&(a, b)| a != index && b != index)
            .map(|&(a, b)| (shift(a), shift(b)))
            .collect();
    }

    /// 排序后的全部键
    pub fn pairs(&self) -> Vec<(usize, usize)> {
        let mut out: Vec<_> = self.pairs.iter().copied().collect();
        out.sort_unstable();
        out
    }
}
