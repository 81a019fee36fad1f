//! 同心环中心搜索的消融实验.
//!
//! 在合成图像上比较不同搜索参数的耗时与精度. 样本数由 `$CENTER9_CASES` 控制.

mod algos;
mod result;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    runner::run().analyze();
}
