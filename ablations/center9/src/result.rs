//! 实验结果.

use crate::algos::Profile;
use std::io::{self, Write};

/// 将 `profile` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, p: &Profile, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.6}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Improved: {}", p.get_improved())?;
    writeln!(w, "{S4}Failed: {}", p.get_failed())?;
    writeln!(w, "{S4}Search total time: {} us", p.get_search_time_us())?;
    writeln!(
        w,
        "{S4}Search average time: {} us",
        f64_to_display(p.get_avg_search_time_us())
    )?;
    writeln!(w, "{S4}Total machine time: {} us", p.get_real_time_us())?;
    writeln!(w, "{S4}Average error: {} px", f64_to_display(p.get_avg_error()))?;
    writeln!(w, "{S4}Max error: {} px", f64_to_display(p.get_max_error()))?;
    writeln!(
        w,
        "{S4}Average iterations: {}",
        f64_to_display(p.get_avg_iterations())
    )?;
    let t = p
        .get_most_time_consuming()
        .map_or_else(|| "/".to_string(), |d| d.as_micros().to_string());
    write!(w, "{S4}Most time-consuming search costs {t} us")?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);

        for (key, profile) in self.data.iter() {
            match describe_into(key, profile, &mut buf) {
                Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
                Err(e) => log::error!("无法输出 `{key}` 的结果: {e}"),
            }
            buf.clear();

            utils::sep();
        }
    }
}
