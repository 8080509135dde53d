use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理对象读取、写入及台账数据库失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 对象不存在 (首次运行时历史文件尚未创建)
    #[error("Object not found: {0}")]
    NotFound(String),
    /// 读写失败
    #[error("IO error: {0}")]
    Io(String),
    /// 台账数据库操作失败
    #[error("Database error: {0}")]
    Database(String),
}
