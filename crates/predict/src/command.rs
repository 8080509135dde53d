use async_trait::async_trait;
use candlewick_core::config::PredictorConfig;
use candlewick_core::predict::entity::{SeriesSnapshot, TradingAction};
use candlewick_core::predict::port::{PredictError, Predictor};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// # Summary
/// 以子进程方式调用外部预测程序。
///
/// # Invariants
/// - 每个快照写入 `<work_dir>/<market>.csv`，程序通过 `--data_dir` 读取。
/// - 目标市场通过 `--coin_to_predict=<market>` 传入。
/// - 超时后子进程被强制终止。
/// - 只有退出码为 0 且最后一行非空输出是合法动作时才返回成功。
pub struct CommandPredictor {
    program: String,
    args: Vec<String>,
    work_dir: PathBuf,
    timeout: Duration,
}

impl CommandPredictor {
    pub fn new(config: &PredictorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            work_dir: PathBuf::from(&config.work_dir),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// # Summary
    /// 把所有快照写入工作目录。
    ///
    /// # Returns
    /// 市场名称含路径字符或写入失败时返回 `PredictError::Spawn`。
    async fn stage(&self, snapshots: &[SeriesSnapshot]) -> Result<(), PredictError> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| PredictError::Spawn(format!("{}: {}", self.work_dir.display(), e)))?;

        for snapshot in snapshots {
            let path = snapshot_path(&self.work_dir, &snapshot.market)?;
            tokio::fs::write(&path, &snapshot.csv)
                .await
                .map_err(|e| PredictError::Spawn(format!("{}: {}", path.display(), e)))?;
            debug!(market = %snapshot.market, path = %path.display(), "snapshot staged");
        }
        Ok(())
    }
}

fn snapshot_path(work_dir: &Path, market: &str) -> Result<PathBuf, PredictError> {
    let valid = !market.is_empty()
        && market
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(PredictError::Spawn(format!("Invalid market name: {:?}", market)));
    }
    Ok(work_dir.join(format!("{}.csv", market)))
}

/// # Summary
/// 取标准输出中最后一个非空行并解析为交易动作。
pub fn parse_action(stdout: &str) -> Result<TradingAction, PredictError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .ok_or_else(|| PredictError::UnknownAction("<empty output>".into()))?;
    line.parse()
        .map_err(|_| PredictError::UnknownAction(line.to_string()))
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[async_trait]
impl Predictor for CommandPredictor {
    /// # Summary
    /// 运行预测程序并返回交易动作。
    ///
    /// # Logic
    /// 1. 校验快照中包含目标市场，并写入工作目录。
    /// 2. 启动子进程，标准输入置空，捕获标准输出与标准错误。
    /// 3. 在超时时间内等待退出；超时则丢弃子进程句柄，由 `kill_on_drop` 终止。
    /// 4. 非零退出返回 `Failed`，附带标准错误的最后几行。
    /// 5. 解析最后一行输出。
    async fn predict(
        &self,
        market: &str,
        snapshots: &[SeriesSnapshot],
    ) -> Result<TradingAction, PredictError> {
        if !snapshots.iter().any(|s| s.market == market) {
            return Err(PredictError::Spawn(format!("No snapshot for market {}", market)));
        }
        self.stage(snapshots).await?;

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(format!("--coin_to_predict={}", market))
            .arg(format!("--data_dir={}", self.work_dir.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PredictError::Spawn(format!("{}: {}", self.program, e)))?;
        info!(program = %self.program, market, "predictor started");

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| PredictError::Failed(e.to_string()))?,
            Err(_) => {
                warn!(market, timeout_secs = self.timeout.as_secs(), "predictor timed out, killed");
                return Err(PredictError::Timeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(PredictError::Failed(format!(
                "{}: {}",
                output.status,
                tail(&stderr, 5)
            )));
        }

        let action = parse_action(&stdout)?;
        info!(market, %action, "predictor finished");
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action_uses_last_line() {
        let out = "loading model\nepoch 3/3\n  none_to_buy  \n\n";
        assert_eq!(parse_action(out).unwrap(), TradingAction::NoneToBuy);
    }

    #[test]
    fn test_parse_action_rejects_noise() {
        assert!(matches!(parse_action(""), Err(PredictError::UnknownAction(_))));
        assert!(matches!(
            parse_action("none_to_buy\nprobability 0.73"),
            Err(PredictError::UnknownAction(l)) if l == "probability 0.73"
        ));
    }

    #[test]
    fn test_snapshot_path_rejects_traversal() {
        let dir = Path::new("/tmp/work");
        assert_eq!(snapshot_path(dir, "btc").unwrap(), dir.join("btc.csv"));
        assert!(snapshot_path(dir, "../etc").is_err());
        assert!(snapshot_path(dir, "").is_err());
    }

    #[test]
    fn test_tail() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}
