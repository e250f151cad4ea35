use std::time::Duration;

use agent::{strategy_for, ActionResult, Agent, AgentConfig};
use anyhow::bail;
use msgs::{
    client_server_msg::ClientServerMsg,
    client_type::{ClientType, GAME_MASTER_HOST_ID},
    config_file::{config_path_from_args, load_config},
    logger::init_logger,
    relay_server_connection_process::spawn_relay_server_connection_process,
    server_client_msg::ServerClientMsg,
    Message,
};
use tokio::{sync::mpsc, time::Instant};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("info");

    let config_path = config_path_from_args();
    let config: AgentConfig = load_config(config_path.as_deref())?;
    let tick = Duration::from_millis(config.tick_ms.max(1));

    let (server_to_main, mut main_from_server) = mpsc::channel(100);
    let to_relay_server_process =
        spawn_relay_server_connection_process(&config.cs_address, ClientType::Agent, server_to_main).await?;

    let (outbox, mut outgoing) = mpsc::unbounded_channel::<Message>();
    let span = tracing::info_span!("agent", team = ?config.team_id);
    let mut agent = Agent::new(config.clone(), strategy_for(config.strategy), outbox, span);

    let mut interval = tokio::time::interval(tick);
    let mut last_tick = Instant::now();
    let mut finished = false;

    while !finished {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                finished = agent.update(now - last_tick) == ActionResult::Finish;
                last_tick = now;
            }
            result = main_from_server.recv() => {
                let Some(msg_bytes) = result else { bail!("connection to communication server lost") };
                match ServerClientMsg::decode(&msg_bytes) {
                    Ok(ServerClientMsg::AssignHostId (host_id)) => tracing::info!(host_id, "registered as agent"),
                    Ok(ServerClientMsg::HostDisconnected (host_id)) if host_id == GAME_MASTER_HOST_ID => {
                        bail!("game master disconnected")
                    }
                    Ok(ServerClientMsg::HostDisconnected (host_id)) => tracing::debug!(host_id, "peer disconnected"),
                    Ok(ServerClientMsg::Game (bytes)) => match Message::decode(bytes) {
                        Ok(message) => agent.inject(message),
                        Err(e) => tracing::warn!("dropping undecodable message: {e}"),
                    },
                    Ok(ServerClientMsg::RegistrationRejected (reason)) => bail!("communication server rejected registration: {reason:?}"),
                    Err(e) => tracing::warn!("dropping relay frame: {e}"),
                }
            }
        }

        while let Ok(message) = outgoing.try_recv() {
            let bytes = message.encode()?;
            to_relay_server_process.send(ClientServerMsg::Game (&bytes).to_bytes()?).await?;
        }
    }

    tracing::info!(state = ?agent.state(), "agent finished");
    Ok(())
}
