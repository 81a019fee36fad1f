//! 以图像形状为键的 q 映射缓存.

use crate::geometry::RadiusMap;
use crate::Idx2d;
use parking_lot::RwLock;
use std::sync::Arc;

/// 单槽缓存. 形状改变时整体替换.
///
/// 重建是幂等的: 两个线程同时发现缓存失效时会各自计算一次, 后写入者覆盖前者,
/// 而两者的值完全相同. 计算过程不持有锁.
#[derive(Debug, Default)]
pub(crate) struct RadiusMapCache {
    slot: RwLock<Option<Arc<RadiusMap>>>,
}

impl RadiusMapCache {
    /// 获取形状为 `shape` 的映射. 缓存缺失或形状不符时调用 `build` 重建并发布.
    pub fn get_or_build<F>(&self, shape: Idx2d, build: F) -> Arc<RadiusMap>
    where
        F: FnOnce() -> RadiusMap,
    {
        if let Some(map) = self.slot.read().as_ref() {
            if map.shape() == shape {
                return Arc::clone(map);
            }
        }

        let fresh = Arc::new(build());
        log::debug!("重建 q 映射缓存, 形状 {shape:?}");
        *self.slot.write() = Some(Arc::clone(&fresh));
        fresh
    }

    /// 当前缓存的形状.
    pub fn shape(&self) -> Option<Idx2d> {
        self.slot.read().as_ref().map(|m| m.shape())
    }

    /// 清空缓存.
    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }
}
