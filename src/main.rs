use anyhow::Result;
use log::info;

use cex_spread_spy::cli::CliApp;
use cex_spread_spy::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件
    dotenv::dotenv().ok();

    let matches = CliApp::build_cli().get_matches();

    // 初始化日志系统
    logging::init(CliApp::log_level(&matches));

    info!("启动跨交易所价差监控...");

    let app = CliApp::new(&matches)?;
    app.run(&matches).await
}
