use async_trait::async_trait;
use candlewick_core::predict::entity::TradingAction;
use candlewick_core::store::error::StoreError;
use candlewick_core::store::port::{RunLedger, RunRecord};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

type RunRow = (String, String, DateTime<Utc>, i64, NaiveDate, String, Option<String>);

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// RunLedger 的 SQLite 实现。
///
/// # Summary
/// 每个市场每次运行写入一行，记录追加行数、最新日期、收盘价与交易动作，用于事后审计。
///
/// # Invariants
/// * 数据库结构在实例创建时初始化。
/// * 十进制数值以 TEXT 保存，避免 REAL 带来的精度损失。
pub struct SqliteRunLedger {
    pool: SqlitePool,
}

impl SqliteRunLedger {
    /// 打开 (或创建) 指定路径的台账数据库。
    ///
    /// # Logic
    /// 1. 确保父目录存在。
    /// 2. 配置 SQLite 连接选项，开启 `create_if_missing`。
    /// 3. 连接数据库并执行 DDL。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 台账实例或数据库错误。
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::init(pool).await
    }

    /// 仅存在于内存中的台账，用于测试
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(db_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS run_ledger (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                market TEXT NOT NULL,
                run_at DATETIME NOT NULL,
                rows_written INTEGER NOT NULL,
                most_recent_date DATE NOT NULL,
                newest_close TEXT NOT NULL,
                action TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_run_ledger_market ON run_ledger (market, run_at);
            "#,
        )
        .execute(&pool)
        .await
        .map_err(db_err)?;

        Ok(Self { pool })
    }
}

fn into_record(row: RunRow) -> Result<RunRecord, StoreError> {
    let (run_id, market, run_at, rows_written, most_recent_date, newest_close, action) = row;
    Ok(RunRecord {
        run_id,
        market,
        run_at,
        rows_written: u64::try_from(rows_written)
            .map_err(|e| StoreError::Database(format!("rows_written: {}", e)))?,
        most_recent_date,
        newest_close: Decimal::from_str(&newest_close)
            .map_err(|e| StoreError::Database(format!("newest_close: {}", e)))?,
        action: action
            .map(|a| TradingAction::from_str(&a))
            .transpose()
            .map_err(StoreError::Database)?,
    })
}

#[async_trait]
impl RunLedger for SqliteRunLedger {
    async fn record(&self, record: &RunRecord) -> Result<(), StoreError> {
        let rows_written = i64::try_from(record.rows_written)
            .map_err(|e| StoreError::Database(format!("rows_written: {}", e)))?;

        sqlx::query(
            "INSERT INTO run_ledger (run_id, market, run_at, rows_written, most_recent_date, newest_close, action) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.run_id)
        .bind(&record.market)
        .bind(record.run_at)
        .bind(rows_written)
        .bind(record.most_recent_date)
        .bind(record.newest_close.to_string())
        .bind(record.action.map(|a| a.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// # Summary
    /// 查询某个市场最近的运行记录。
    ///
    /// # Logic
    /// 按 `run_at` 倒序，同一时刻按插入顺序倒序。
    async fn recent(&self, market: &str, limit: u32) -> Result<Vec<RunRecord>, StoreError> {
        sqlx::query_as::<_, RunRow>(
            "SELECT run_id, market, run_at, rows_written, most_recent_date, newest_close, action FROM run_ledger WHERE market = ? ORDER BY run_at DESC, id DESC LIMIT ?",
        )
        .bind(market)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(into_record)
        .collect()
    }
}
