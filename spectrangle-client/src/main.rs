use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protocol::{Connector, TcpConnector};
use spectrangle_ai::{GreedyConfig, GreedyStrategy};
use spectrangle_client::game::spawn_stdin;
use spectrangle_client::{Brain, ClientConfig, Listener, Outcome};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("spectrangle_client=info".parse()?))
        .init();

    let config = ClientConfig::load()?;
    let addr = config.addr();
    let conn = TcpConnector.connect(&addr).await?;
    info!("已连接服务器: {}", addr);

    let brain = if config.computer {
        Brain::computer(GreedyStrategy::new(GreedyConfig { seed: config.seed }))
    } else {
        println!("命令: move <牌> <旋转> <格子> | replace <牌> | skip | hint | exit");
        Brain::Human(spawn_stdin())
    };

    let mut listener = Listener::new(conn, config.name, config.preference, brain);
    match listener.run().await? {
        Outcome::Finished(scores) => {
            println!("对局结束");
            for (name, score) in scores {
                println!("  {}: {}", name, score);
            }
        }
        Outcome::Kicked => println!("你被踢出了对局"),
        Outcome::Exited => println!("已退出"),
        Outcome::Disconnected => println!("服务器断开了连接"),
        Outcome::Abandoned => println!("人数不足，对局结束"),
    }
    Ok(())
}
