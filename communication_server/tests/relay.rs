use std::{net::SocketAddr, sync::Arc, time::Duration};

use communication_server::{serve, HostMapping, GAME_MASTER_HOST_ID};
use msgs::{
    client_server_msg::ClientServerMsg,
    client_type::ClientType,
    dequeue::dequeue_msg,
    geometry::TeamId,
    payload::{JoinRequest, JoinResponse},
    server_client_msg::{RejectReason, ServerClientMsg},
    Message, Payload,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

struct TestClient {
    stream: TcpStream,
    input_buffer: Vec<u8>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> TestClient {
        TestClient {
            stream: TcpStream::connect(addr).await.unwrap(),
            input_buffer: Vec::new(),
        }
    }

    async fn send(&mut self, msg: ClientServerMsg<'_>) {
        self.stream.write_all(&msg.to_bytes().unwrap()).await.unwrap();
    }

    async fn next_frame(&mut self) -> Vec<u8> {
        let mut static_buffer = [0; 1024];
        loop {
            if let Some((begin, end)) = dequeue_msg(&self.input_buffer).unwrap() {
                let body = self.input_buffer[begin..end].to_vec();
                self.input_buffer.drain(..end);
                return body;
            }
            let len = timeout(Duration::from_secs(5), self.stream.read(&mut static_buffer))
                .await
                .expect("timed out waiting for a frame")
                .unwrap();
            assert!(len > 0, "server closed the connection");
            self.input_buffer.extend(&static_buffer[..len]);
        }
    }

    async fn register(&mut self, kind: ClientType) -> u32 {
        self.send(ClientServerMsg::Register (kind)).await;
        match ServerClientMsg::decode(&self.next_frame().await).unwrap() {
            ServerClientMsg::AssignHostId (id) => id,
            other => panic!("unexpected registration reply {other:?}"),
        }
    }

    async fn next_message(&mut self) -> Message {
        let frame = self.next_frame().await;
        match ServerClientMsg::decode(&frame).unwrap() {
            ServerClientMsg::Game (bytes) => Message::decode(bytes).unwrap(),
            other => panic!("expected a game frame, got {other:?}"),
        }
    }
}

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, Arc::new(HostMapping::new())));
    addr
}

#[tokio::test]
async fn join_round_trip_through_the_relay() {
    let addr = start_server().await;

    let mut game_master = TestClient::connect(addr).await;
    assert_eq!(game_master.register(ClientType::GameMaster).await, GAME_MASTER_HOST_ID);

    let mut agent = TestClient::connect(addr).await;
    let agent_id = agent.register(ClientType::Agent).await;
    assert!(agent_id > 0);

    let request = Message::new(999, Payload::JoinRequest (JoinRequest { team_id: TeamId::Blue, wants_to_be_leader: true }));
    agent.send(ClientServerMsg::Game (&request.encode().unwrap())).await;

    let received = game_master.next_message().await;
    assert_eq!(received.agent_id, agent_id);
    assert_eq!(received.payload, request.payload);

    let response = Message::new(agent_id, Payload::JoinResponse (JoinResponse { accepted: true, agent_id }));
    game_master.send(ClientServerMsg::Game (&response.encode().unwrap())).await;
    assert_eq!(agent.next_message().await, response);
}

#[tokio::test]
async fn second_game_master_is_turned_away() {
    let addr = start_server().await;

    let mut first = TestClient::connect(addr).await;
    first.register(ClientType::GameMaster).await;

    let mut second = TestClient::connect(addr).await;
    second.send(ClientServerMsg::Register (ClientType::GameMaster)).await;
    assert_eq!(
        ServerClientMsg::decode(&second.next_frame().await).unwrap(),
        ServerClientMsg::RegistrationRejected (RejectReason::GameMasterAlreadyRegistered)
    );
}

#[tokio::test]
async fn game_master_hears_about_agent_disconnects() {
    let addr = start_server().await;

    let mut game_master = TestClient::connect(addr).await;
    game_master.register(ClientType::GameMaster).await;

    let mut agent = TestClient::connect(addr).await;
    let agent_id = agent.register(ClientType::Agent).await;
    agent.send(ClientServerMsg::Disconnect).await;

    assert_eq!(
        ServerClientMsg::decode(&game_master.next_frame().await).unwrap(),
        ServerClientMsg::HostDisconnected (agent_id)
    );
}

#[tokio::test]
async fn malformed_game_frame_does_not_drop_the_connection() {
    let addr = start_server().await;

    let mut game_master = TestClient::connect(addr).await;
    game_master.register(ClientType::GameMaster).await;
    let mut agent = TestClient::connect(addr).await;
    let agent_id = agent.register(ClientType::Agent).await;

    agent.send(ClientServerMsg::Game (&[0xff; 10])).await;
    let request = Message::new(agent_id, Payload::DiscoverRequest);
    agent.send(ClientServerMsg::Game (&request.encode().unwrap())).await;

    assert_eq!(game_master.next_message().await, request);
}
