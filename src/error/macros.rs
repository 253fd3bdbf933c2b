//! # 错误处理宏

/// 条件不成立时提前返回给定错误（自动 `into()`）
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// 立即返回给定错误（自动 `into()`）
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}
