use chrono::{DateTime, Utc};

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 对账流程中“今天/昨天”的判断必须通过此接口获取当前时间，以便测试中固定日期。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 实际运行使用的真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用虚拟时钟，把“当前时间”固定在任意一天。
pub struct FakeClockProvider {
    current_time: DateTime<Utc>,
}

impl FakeClockProvider {
    /// 使用指定的时间创建虚拟时钟
    pub fn new(current_time: DateTime<Utc>) -> Self {
        Self { current_time }
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        self.current_time
    }
}
