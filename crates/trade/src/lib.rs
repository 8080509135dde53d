//! 券商适配器：本地模拟账户与签名 REST 交易所。

pub mod paper;
pub mod rest;
