use std::{sync::Arc, time::Duration};

use agent::{Agent, AgentConfig, AgentState, DoNothingStrategy};
use communication_server::{serve, HostMapping};
use msgs::{
    client_server_msg::ClientServerMsg,
    client_type::ClientType,
    geometry::TeamId,
    payload::{JoinRequest, JoinResponse},
    relay_server_connection_process::spawn_relay_server_connection_process,
    server_client_msg::ServerClientMsg,
    Message, Payload,
};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tracing::Span;

async fn next_frame(receiver: &mut mpsc::Receiver<Vec<u8>>) -> Vec<u8> {
    timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("relay connection closed")
}

async fn next_game_message(receiver: &mut mpsc::Receiver<Vec<u8>>) -> Message {
    loop {
        let frame = next_frame(receiver).await;
        if let ServerClientMsg::Game (bytes) = ServerClientMsg::decode(&frame).unwrap() {
            return Message::decode(bytes).unwrap();
        }
    }
}

async fn assigned_host_id(receiver: &mut mpsc::Receiver<Vec<u8>>) -> u32 {
    match ServerClientMsg::decode(&next_frame(receiver).await).unwrap() {
        ServerClientMsg::AssignHostId (host_id) => host_id,
        other => panic!("unexpected registration reply {other:?}"),
    }
}

#[tokio::test]
async fn agent_joins_through_the_relay() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(serve(listener, Arc::new(HostMapping::new())));

    let (server_to_gm, mut gm_from_server) = mpsc::channel(100);
    let gm_to_server = spawn_relay_server_connection_process(&address, ClientType::GameMaster, server_to_gm)
        .await
        .unwrap();
    assert_eq!(assigned_host_id(&mut gm_from_server).await, 0);

    let (server_to_agent, mut agent_from_server) = mpsc::channel(100);
    let agent_to_server = spawn_relay_server_connection_process(&address, ClientType::Agent, server_to_agent)
        .await
        .unwrap();
    let host_id = assigned_host_id(&mut agent_from_server).await;

    let (outbox, mut outgoing) = mpsc::unbounded_channel();
    let config = AgentConfig { team_id: TeamId::Blue, wants_to_be_leader: true, ..AgentConfig::default() };
    let mut agent = Agent::new(config, Box::new(DoNothingStrategy), outbox, Span::none());

    agent.update(Duration::ZERO);
    let request = outgoing.try_recv().unwrap().encode().unwrap();
    agent_to_server.send(ClientServerMsg::Game (&request).to_bytes().unwrap()).await.unwrap();

    let received = next_game_message(&mut gm_from_server).await;
    assert_eq!(received.agent_id, host_id);
    assert_eq!(
        received.payload,
        Payload::JoinRequest (JoinRequest { team_id: TeamId::Blue, wants_to_be_leader: true })
    );

    let response = Message::new(host_id, Payload::JoinResponse (JoinResponse { accepted: true, agent_id: host_id }));
    let response = response.encode().unwrap();
    gm_to_server.send(ClientServerMsg::Game (&response).to_bytes().unwrap()).await.unwrap();

    agent.inject(next_game_message(&mut agent_from_server).await);
    agent.update(Duration::ZERO);
    assert_eq!(agent.state(), AgentState::WaitingForStart);
    assert_eq!(agent.knowledge().agent_id, host_id);
}
