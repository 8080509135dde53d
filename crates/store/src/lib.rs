//! 存储适配器：历史序列的对象存储实现与运行台账。

pub mod blob;
pub mod ledger;
