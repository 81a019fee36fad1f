//! 搜索运行统计.

use std::time::{Duration, Instant};

/// ablation/benchmark 计时器.
///
/// 支持 "中途中断" 与 "结束中断, 继续开始计时".
#[derive(Clone, Debug)]
struct AccTimer {
    consumed: Duration,
    since: Instant,
}

impl AccTimer {
    /// 初始化计时器. 初始化时视为已经开始计时.
    #[inline]
    pub fn new() -> Self {
        Self {
            consumed: Duration::ZERO,
            since: Instant::now(),
        }
    }

    /// 开始计时.
    #[inline]
    pub fn start(&mut self) {
        self.since = Instant::now();
    }

    /// 结束计时, 并将这一区间的时间累加. 返回本轮计时时长.
    ///
    /// 上一次调用必须是 `self.start()`, 否则计算时间值无意义.
    #[inline]
    pub fn elapsed(&mut self) -> Duration {
        let d = self.since.elapsed();
        self.consumed += d;
        d
    }

    /// 累计时间 (微秒).
    #[inline]
    pub fn get_total_us(&self) -> u64 {
        self.consumed.as_micros() as u64
    }
}

impl Default for AccTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// 一组搜索参数在全部样本上的统计.
#[derive(Clone, Debug)]
pub struct Profile {
    /// 搜索成功改进初始猜测的样本数.
    improved: u64,

    /// 未能改进初始猜测, 或直接返回错误的样本数.
    failed: u64,

    /// 搜索花费的总时间.
    search_time: AccTimer,

    /// 从创建到 `finish` 的总时间, 包括搜索之外的记录开销.
    real_time: AccTimer,

    /// 最耗时的一次搜索.
    most: Option<Duration>,

    /// 改进样本的像素误差之和.
    error_sum: f64,

    /// 改进样本的最大像素误差.
    error_max: f64,

    /// 改进样本的迭代次数之和.
    iterations: u64,
}

impl Profile {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self {
            improved: 0,
            failed: 0,
            search_time: AccTimer::default(),
            real_time: AccTimer::default(),
            most: None,
            error_sum: 0.0,
            error_max: 0.0,
            iterations: 0,
        }
    }

    /// 开始一次搜索计时.
    #[inline]
    pub fn search_start(&mut self) {
        self.search_time.start();
    }

    /// 结束一次搜索计时.
    #[inline]
    pub fn search_elapsed(&mut self) {
        let d = self.search_time.elapsed();
        self.most = Some(self.most.map_or(d, |m| m.max(d)));
    }

    /// 记录一次改进了初始猜测的搜索.
    #[inline]
    pub fn count_improved(&mut self, error: f64, iterations: u32) {
        self.improved += 1;
        self.error_sum += error;
        self.error_max = self.error_max.max(error);
        self.iterations += iterations as u64;
    }

    /// 记录一次失败的搜索.
    #[inline]
    pub fn count_failed(&mut self) {
        self.failed += 1;
    }

    /// 结束全部计时.
    #[inline]
    pub fn finish(mut self) -> Self {
        self.real_time.elapsed();
        self
    }

    /// 改进样本数.
    #[inline]
    pub fn get_improved(&self) -> u64 {
        self.improved
    }

    /// 失败样本数.
    #[inline]
    pub fn get_failed(&self) -> u64 {
        self.failed
    }

    /// 以微秒为单位获得搜索的总时间.
    #[inline]
    pub fn get_search_time_us(&self) -> u64 {
        self.search_time.get_total_us()
    }

    /// 以微秒为单位获得任务的总时间.
    #[inline]
    pub fn get_real_time_us(&self) -> u64 {
        self.real_time.get_total_us()
    }

    /// 以微秒为单位获得单个样本的平均搜索时间.
    pub fn get_avg_search_time_us(&self) -> Option<f64> {
        match self.improved + self.failed {
            0 => None,
            n => Some(self.get_search_time_us() as f64 / n as f64),
        }
    }

    /// 改进样本的平均像素误差.
    pub fn get_avg_error(&self) -> Option<f64> {
        match self.improved {
            0 => None,
            n => Some(self.error_sum / n as f64),
        }
    }

    /// 改进样本的最大像素误差.
    pub fn get_max_error(&self) -> Option<f64> {
        (self.improved > 0).then_some(self.error_max)
    }

    /// 改进样本的平均迭代次数.
    pub fn get_avg_iterations(&self) -> Option<f64> {
        match self.improved {
            0 => None,
            n => Some(self.iterations as f64 / n as f64),
        }
    }

    /// 最耗时的一次搜索. 不存在任何搜索时返回 `None`.
    #[inline]
    pub fn get_most_time_consuming(&self) -> Option<Duration> {
        self.most
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}
