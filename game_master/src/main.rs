use std::time::Duration;

use anyhow::{bail, Context};
use game_master::{
    console_cmd::ConsoleCmd, console_input::console_input_thread, GameMaster, GameMasterConfig,
};
use msgs::{
    client_server_msg::ClientServerMsg,
    client_type::ClientType,
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
    let config: GameMasterConfig = load_config(config_path.as_deref())?;
    let tick = Duration::from_millis(config.tick_ms.max(1));

    let (server_to_main, mut main_from_server) = mpsc::channel(100);
    let to_relay_server_process =
        spawn_relay_server_connection_process(&config.cs_address, ClientType::GameMaster, server_to_main).await?;

    let (outbox, mut outgoing) = mpsc::unbounded_channel::<Message>();
    let mut game_master = GameMaster::new(config, outbox, tracing::info_span!("game_master"));
    game_master.apply_configuration().context("configuration rejected")?;

    let mut console_receiver = console_input_thread();
    let mut interval = tokio::time::interval(tick);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                if let Err(e) = game_master.update(now - last_tick) {
                    tracing::error!("match halted: {e}");
                }
                last_tick = now;
            }
            result = main_from_server.recv() => {
                let Some(msg_bytes) = result else { bail!("connection to communication server lost") };
                match ServerClientMsg::decode(&msg_bytes) {
                    Ok(ServerClientMsg::AssignHostId (host_id)) => tracing::info!(host_id, "registered as game master"),
                    Ok(ServerClientMsg::HostDisconnected (host_id)) => game_master.agent_disconnected(host_id),
                    Ok(ServerClientMsg::Game (bytes)) => match Message::decode(bytes) {
                        Ok(message) => game_master.receive(message),
                        Err(e) => tracing::warn!("dropping undecodable message: {e}"),
                    },
                    Ok(ServerClientMsg::RegistrationRejected (reason)) => bail!("communication server rejected registration: {reason:?}"),
                    Err(e) => tracing::warn!("dropping relay frame: {e}"),
                }
            }
            Some(cmd) = console_receiver.recv() => {
                let result = match cmd {
                    ConsoleCmd::Start => game_master.start_game(),
                    ConsoleCmd::Pause => game_master.pause_game(),
                    ConsoleCmd::Resume => game_master.resume_game(),
                    ConsoleCmd::Status => {
                        println!("{}", serde_json::to_string_pretty(&game_master.snapshot())?);
                        Ok(())
                    }
                    ConsoleCmd::Quit => break,
                };
                if let Err(e) = result {
                    println!("error: {e}");
                }
            }
        }

        while let Ok(message) = outgoing.try_recv() {
            let bytes = message.encode()?;
            to_relay_server_process.send(ClientServerMsg::Game (&bytes).to_bytes()?).await?;
        }
    }

    Ok(())
}
