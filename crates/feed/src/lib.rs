//! 日线行情数据源适配器：Yahoo Finance 图表接口 (股票/ETF) 与 Coinbase Exchange (加密货币)。

pub mod coinbase;
pub mod http;
pub mod yahoo;
