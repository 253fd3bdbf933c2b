//! # CORS Gateway 主程序
//!
//! 读取配置、初始化日志并启动转发网关

use clap::Parser;
use cors_gateway::{
    ProxyServer, Result,
    config::ConfigManager,
    lerror, linfo,
    logging::{self, LogComponent, LogStage},
    proxy::{RelayChain, shutdown_signal},
};
use std::path::PathBuf;
use std::sync::Arc;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "cors-gateway", version, about = "CORS forwarding gateway with relay fallback")]
struct Cli {
    /// 配置文件路径（默认 config/config.{RUST_ENV}.toml）
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 日志级别，`RUST_LOG` 存在时以其为准
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// 覆盖监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 只校验配置并打印回退链
    #[arg(long)]
    check: bool,

    /// 打印日志配置说明
    #[arg(long)]
    log_help: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.log_help {
        logging::print_logging_help();
        return Ok(());
    }

    // 初始化日志系统
    logging::init_logging(cli.log_level.as_deref());

    let manager = match ConfigManager::new(cli.config.as_deref()) {
        Ok(manager) => manager,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Config,
                "config_load_failed",
                &format!("配置加载失败: {e}")
            );
            return Err(e);
        }
    };

    let mut config = (*manager.config()).clone();
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if cli.check {
        let settings = config.gateway.resolve()?;
        let chain = RelayChain::from_config(&config.gateway.relays);
        println!("配置有效: {}", manager.source().display());
        println!("  监听地址: {}", config.server.bind_address()?);
        println!("  部署模式: {}", settings.deployment_mode);
        println!("  代理路由: {} ({:?})", settings.route_path, settings.extraction_mode);
        println!("  单次超时: {}", settings.timeout);
        println!("  回退链: {}", chain.step_names().join(" -> "));
        return Ok(());
    }

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动",
        config_path = %manager.source().display(),
        env_overrides = manager.override_count()
    );

    let server = ProxyServer::new(Arc::new(config))?;
    if let Err(e) = server.serve(shutdown_signal()).await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        return Err(e);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}
