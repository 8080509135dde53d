//! 应用服务层：多市场对账流水线与一次完整的交易调度。
//!
//! 编译期只依赖 `candlewick-core` 中的端口定义，具体实现由二进制入口注入。

pub mod error;
pub mod job;
pub mod pipeline;
