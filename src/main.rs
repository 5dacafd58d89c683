use anyhow::Result;
use exam_simulator::utils::logging;
use exam_simulator::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 命令行参数为要处理的会话ID，不传则处理全部会话
    let session_ids: Vec<String> = std::env::args().skip(1).collect();

    // 初始化并运行应用
    let stats = App::initialize(config).await?.run(session_ids).await?;

    if stats.failed > 0 {
        anyhow::bail!("{} 个会话处理失败", stats.failed);
    }

    Ok(())
}
