//! 历史日线序列的对账逻辑：解析、游标、增量写入与前向填充。
//!
//! 本 crate 只做同步的纯数据变换，不涉及任何网络或对象存储访问。

pub mod cursor;
pub mod gap;
pub mod parser;
pub mod reconcile;
pub mod writer;
