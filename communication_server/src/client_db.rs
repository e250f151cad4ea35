use std::{net::SocketAddr, ops::ControlFlow, sync::Arc};

use msgs::{
    client_server_msg::ClientServerMsg,
    client_type::ClientType,
    server_client_msg::ServerClientMsg,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};

use crate::{
    error::ConnectionError,
    host_mapping::{ConnectionId, HostMapping, GAME_MASTER_HOST_ID},
    router,
};

pub struct ClientDb {
    pub session_id_counter: ConnectionId,
    pub mapping: Arc<HostMapping>,
}

impl ClientDb {
    pub fn new(mapping: Arc<HostMapping>) -> ClientDb {
        ClientDb {
            session_id_counter: 0,
            mapping,
        }
    }

    pub fn new_client(&mut self, socket: TcpStream, addr: SocketAddr) {
        let connection = self.session_id_counter;
        spawn_client_process(socket, self.mapping.clone(), connection, addr);
        self.session_id_counter = self.session_id_counter.wrapping_add(1);
        tracing::info!(connection, %addr, "accepted client");
    }
}

struct Session {
    connection: ConnectionId,
    mapping: Arc<HostMapping>,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
    registration: Option<(u32, ClientType)>,
}

impl Session {
    async fn handle_frame(&mut self, socket: &mut TcpStream, msg: ClientServerMsg<'_>) -> ControlFlow<()> {
        let Some((host_id, kind)) = self.registration else {
            return self.register(socket, msg).await;
        };

        match msg {
            ClientServerMsg::Disconnect => return ControlFlow::Break(()),
            ClientServerMsg::Register (_) => {
                let e = ConnectionError::DuplicateRegistration(self.connection);
                tracing::warn!(host_id, "ignoring frame: {e}");
            }
            ClientServerMsg::Game (envelope) => {
                if let Err(e) = router::route(&self.mapping, host_id, kind, envelope) {
                    tracing::warn!(host_id, "dropped message: {e}");
                }
            }
        }
        ControlFlow::Continue(())
    }

    async fn register(&mut self, socket: &mut TcpStream, msg: ClientServerMsg<'_>) -> ControlFlow<()> {
        let ClientServerMsg::Register (kind) = msg else {
            tracing::warn!(connection = self.connection, "first frame was not a registration, closing");
            return ControlFlow::Break(());
        };

        let (reply, flow) = match self.mapping.register(self.connection, kind, self.outbox.clone()) {
            Ok(host_id) => {
                tracing::info!(connection = self.connection, host_id, ?kind, "registered");
                self.registration = Some((host_id, kind));
                (ServerClientMsg::AssignHostId (host_id), ControlFlow::Continue(()))
            }
            Err(e) => {
                tracing::warn!(connection = self.connection, ?kind, "registration rejected: {e}");
                (ServerClientMsg::RegistrationRejected (e.reject_reason()), ControlFlow::Break(()))
            }
        };

        let mut output_buffer = Vec::new();
        if reply.pack(&mut output_buffer).is_err() || socket.write_all(&output_buffer).await.is_err() {
            return ControlFlow::Break(());
        }
        flow
    }

    /// Drops the registration and tells the other side who left.
    fn close(&self) {
        let Some((host_id, kind)) = self.mapping.unregister(self.connection) else { return };
        tracing::info!(host_id, ?kind, "host disconnected");

        match kind {
            ClientType::Agent => {
                let Some(game_master) = self.mapping.game_master() else { return };
                match ServerClientMsg::HostDisconnected (host_id).to_bytes() {
                    Ok(bytes) => {
                        let _ = game_master.outbox.send(bytes);
                    }
                    Err(e) => tracing::error!("could not pack disconnect notice: {e}"),
                }
            }
            ClientType::GameMaster => {
                router::broadcast_to_agents(&self.mapping, &ServerClientMsg::HostDisconnected (GAME_MASTER_HOST_ID));
            }
        }
    }
}

pub fn spawn_client_process(mut socket: TcpStream, mapping: Arc<HostMapping>, connection: ConnectionId, addr: SocketAddr) {
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();

        let (outbox, mut inbox) = mpsc::unbounded_channel::<Vec<u8>>();
        let mut session = Session {
            connection,
            mapping,
            outbox,
            registration: None,
        };

        'session: loop {
            tokio::select! {
                biased;
                result = inbox.recv() => {
                    let Some(output_buffer) = result else { break 'session };
                    if let Err(e) = socket.write_all(&output_buffer).await {
                        tracing::warn!(connection, "disconnecting because of error while writing to socket: {e}");
                        break 'session;
                    }
                }
                result = socket.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(e) => {
                            tracing::warn!(connection, "error while reading from socket: {e}");
                            break 'session;
                        }
                    };
                    if len == 0 {
                        tracing::debug!(connection, %addr, "client closed its socket");
                        break 'session;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    loop {
                        let (cursor, msg) = match ClientServerMsg::dequeue_and_decode(&input_buffer) {
                            Ok(Some(frame)) => frame,
                            Ok(None) => break,
                            Err(e) => {
                                tracing::warn!(connection, "unreadable stream: {e}");
                                break 'session;
                            }
                        };

                        let flow = match msg {
                            Ok(msg) => session.handle_frame(&mut socket, msg).await,
                            Err(e) => {
                                tracing::warn!(connection, "dropped frame: {e}");
                                ControlFlow::Continue(())
                            }
                        };

                        input_buffer.drain(..cursor);
                        if flow.is_break() {
                            break 'session;
                        }
                    }
                }
            }
        }

        session.close();
    });
}
