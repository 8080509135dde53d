//! 预测程序适配器：以子进程方式运行外部模型并解析交易动作。

pub mod command;
