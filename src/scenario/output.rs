//! 结果目录布局：`<root>/<scenario>/<tcp>/run-<run>/`

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::options::ScenarioId;
use crate::error::ExperimentError;

pub const CWND_FILE: &str = "cwnd.csv";
pub const FLOWMON_FILE: &str = "flowmon.xml";
pub const MANIFEST_FILE: &str = "run.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    dir: PathBuf,
}

impl OutputLayout {
    /// 纯计算，不触碰文件系统
    pub fn resolve(root: &Path, scenario: ScenarioId, variant: &str, run: u32) -> PathBuf {
        root.join(scenario.as_str())
            .join(variant)
            .join(format!("run-{run}"))
    }

    /// 计算并创建目录（已存在时不报错）
    pub fn create(
        root: &Path,
        scenario: ScenarioId,
        variant: &str,
        run: u32,
    ) -> Result<Self, ExperimentError> {
        let dir = Self::resolve(root, scenario, variant, run);
        fs::create_dir_all(&dir).map_err(|e| ExperimentError::io(&dir, e))?;
        info!(dir = %dir.display(), "📁 输出目录就绪");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cwnd_path(&self) -> PathBuf {
        self.dir.join(CWND_FILE)
    }

    pub fn flowmon_path(&self) -> PathBuf {
        self.dir.join(FLOWMON_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}
