//! candlewick 的领域核心：实体、错误类型与各外部协作者的端口 (Port) 定义。
//!
//! 所有具体实现 (行情源、对象存储、券商、预测程序、通知) 都位于独立的 crate 中，
//! 只依赖本 crate 暴露的 Trait。

pub mod common;
pub mod config;

pub mod series {
    pub mod entity;
    pub mod error;
}

pub mod market {
    pub mod error;
    pub mod port;
}

pub mod store {
    pub mod error;
    pub mod port;
}

pub mod trade {
    pub mod entity;
    pub mod port;
}

pub mod predict {
    pub mod entity;
    pub mod port;
}

pub mod notify {
    pub mod error;
    pub mod port;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
