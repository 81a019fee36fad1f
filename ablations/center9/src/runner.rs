//! 程序运行函数.

use crate::algos::{self, Profile, VARIANTS};
use crate::result::AblationResult;
use std::thread;
use utils::loader;

/// 实际运行.
pub fn run() -> AblationResult {
    let cases = loader::ring_cases_from_env_or_default();
    log::info!(
        "Running ablation studies on {} synthetic frames ({} cpus)...",
        cases.len(),
        utils::cpus()
    );
    let cases = cases.as_slice();

    thread::scope(|s| {
        let handles = VARIANTS.map(|(name, config)| {
            s.spawn(move || algos::run_variant(name, config(), cases))
        });

        AblationResult::from_iter(VARIANTS.into_iter().zip(handles).map(|((name, _), th)| {
            let profile = th.join().unwrap_or_else(|_| {
                log::error!("{name}: 线程异常退出");
                Profile::new()
            });
            (name, profile)
        }))
    })
}
