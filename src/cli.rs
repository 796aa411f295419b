use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::exchanges::{fixture, GatewayRegistry};
use crate::monitor::ArbitrageMonitor;
use crate::server::{self, AppState};
use crate::table_display;

// 命令行参数常量
const CONFIG_ARG: &str = "config";
const PORT_ARG: &str = "port";
const ONCE_ARG: &str = "once";
const DEMO_ARG: &str = "demo";
const LOG_LEVEL_ARG: &str = "log-level";

/// CLI应用程序结构
pub struct CliApp {
    config: Config,
    demo: bool,
}

impl CliApp {
    /// 根据命令行参数加载配置
    pub fn new(matches: &ArgMatches) -> Result<Self> {
        let config_path = matches.get_one::<PathBuf>(CONFIG_ARG);
        let mut config = Config::load(config_path.map(|p| p.as_path()))?;

        if let Some(port) = matches.get_one::<u16>(PORT_ARG) {
            config.server.port = *port;
        }
        info!("配置加载完成");

        Ok(Self {
            config,
            demo: matches.get_flag(DEMO_ARG),
        })
    }

    /// 构建命令行参数解析器
    pub fn build_cli() -> Command {
        Command::new("cex-spread-spy")
            .version(env!("CARGO_PKG_VERSION"))
            .about("跨交易所现货价差监控")
            .arg(
                Arg::new(CONFIG_ARG)
                    .long(CONFIG_ARG)
                    .short('c')
                    .help("配置文件路径")
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new(PORT_ARG)
                    .long(PORT_ARG)
                    .short('p')
                    .help("HTTP 监听端口 (覆盖配置文件)")
                    .value_name("PORT")
                    .value_parser(clap::value_parser!(u16)),
            )
            .arg(
                Arg::new(ONCE_ARG)
                    .long(ONCE_ARG)
                    .help("扫描一次并在终端打印表格后退出")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new(DEMO_ARG)
                    .long(DEMO_ARG)
                    .help("使用内置演示报价，不访问交易所")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new(LOG_LEVEL_ARG)
                    .long(LOG_LEVEL_ARG)
                    .help("日志级别 (error, warn, info, debug, trace)")
                    .value_name("LEVEL"),
            )
    }

    /// 命令行指定的日志级别
    pub fn log_level(matches: &ArgMatches) -> Option<&str> {
        matches.get_one::<String>(LOG_LEVEL_ARG).map(|s| s.as_str())
    }

    /// 运行CLI应用程序
    pub async fn run(&self, matches: &ArgMatches) -> Result<()> {
        let monitor = self.build_monitor()?;

        if matches.get_flag(ONCE_ARG) {
            info!("执行单次扫描...");
            let snapshot = monitor.scan().await?;
            table_display::print_snapshot(&snapshot, monitor.columns());
            return Ok(());
        }

        let addr = self.listen_addr()?;
        let state = Arc::new(AppState { monitor });
        server::serve(state, addr).await
    }

    fn build_monitor(&self) -> Result<ArbitrageMonitor> {
        if self.demo {
            info!("演示模式：使用内置报价");
            let mut registry = GatewayRegistry::new();
            for gateway in fixture::demo_gateways() {
                registry.register(Arc::new(gateway));
            }
            return Ok(ArbitrageMonitor::from_registry(&self.config, registry));
        }

        ArbitrageMonitor::from_config(&self.config)
    }

    fn listen_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.config.server.bind, self.config.server.port);
        match raw.parse() {
            Ok(addr) => Ok(addr),
            Err(e) => bail!("无效的监听地址 {}: {}", raw, e),
        }
    }
}
