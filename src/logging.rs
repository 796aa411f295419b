use log::LevelFilter;
use std::str::FromStr;

/// 初始化日志系统
///
/// 默认 info 级别；`RUST_LOG` 可以覆盖，命令行传入的级别优先于两者。
pub fn init(level: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Info);
    builder.parse_default_env();

    if let Some(level) = level.and_then(parse_level) {
        builder.filter_level(level);
    }

    // 测试中可能被重复调用
    let _ = builder.try_init();
}

pub fn parse_level(level: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(level.trim()).ok()
}
