use anyhow::Context;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::mpsc,
};

use crate::{client_server_msg::ClientServerMsg, client_type::ClientType, dequeue::dequeue_msg};

/// Connects to the communication server and registers as `kind`.
///
/// Every complete relay frame body read from the socket is forwarded to
/// `server_to_main`. Bytes sent on the returned channel are written to the
/// socket as they are. The task ends when either side goes away; dropping
/// `server_to_main`'s receiver is how the main loop notices.
pub async fn spawn_relay_server_connection_process(
    address: &str,
    kind: ClientType,
    server_to_main: mpsc::Sender<Vec<u8>>,
) -> anyhow::Result<mpsc::Sender<Vec<u8>>> {
    let mut stream = TcpStream::connect(address)
        .await
        .with_context(|| format!("could not connect to communication server at {address}"))?;

    let register = ClientServerMsg::Register (kind).to_bytes()?;
    stream.write_all(&register).await.context("could not send registration")?;
    tracing::info!(%address, ?kind, "connected to communication server");

    let (main_to_server, mut server_from_main) = mpsc::channel::<Vec<u8>>(100);
    tokio::spawn(async move {
        let mut static_buffer = [0; 1024];
        let mut input_buffer = Vec::new();

        'connected: loop {
            tokio::select! {
                result = stream.read(&mut static_buffer) => {
                    let len = match result {
                        Ok(len) => len,
                        Err(e) => {
                            tracing::warn!("error while reading from socket: {e}");
                            break 'connected;
                        }
                    };
                    if len == 0 {
                        tracing::info!("communication server closed the connection");
                        break 'connected;
                    }
                    input_buffer.extend(&static_buffer[..len]);

                    loop {
                        let (begin, end) = match dequeue_msg(&input_buffer) {
                            Ok(Some(range)) => range,
                            Ok(None) => break,
                            Err(e) => {
                                tracing::error!("unreadable stream from communication server: {e}");
                                break 'connected;
                            }
                        };
                        let bytes = input_buffer[begin..end].to_vec();
                        input_buffer.drain(..end);
                        if server_to_main.send(bytes).await.is_err() {
                            break 'connected;
                        }
                    }
                }
                result = server_from_main.recv() => {
                    let Some(msg) = result else {
                        if let Ok(bytes) = ClientServerMsg::Disconnect.to_bytes() {
                            let _ = stream.write_all(&bytes).await;
                        }
                        break 'connected;
                    };

                    if let Err(err) = stream.write_all(&msg).await {
                        tracing::warn!("error while writing to stream: {err}");
                        break 'connected;
                    }
                }
            }
        }
        tracing::debug!("relay connection process finished");
    });

    Ok(main_to_server)
}
