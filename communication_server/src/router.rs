use msgs::{client_type::ClientType, server_client_msg::ServerClientMsg, Envelope};

use crate::{
    error::ConnectionError,
    host_mapping::{HostMapping, GAME_MASTER_HOST_ID},
};

/// Forwards one game envelope and returns the destination host id.
///
/// Agent traffic always goes to the game master, stamped with the sender's
/// host id. Game master traffic goes to the agent named in the envelope.
pub fn route(mapping: &HostMapping, sender: u32, sender_kind: ClientType, envelope: &[u8]) -> Result<u32, ConnectionError> {
    let header = Envelope::peek(envelope)?;

    let (destination, bytes) = match sender_kind {
        ClientType::GameMaster => {
            if header.agent_id == GAME_MASTER_HOST_ID {
                return Err(ConnectionError::UnknownHost(header.agent_id));
            }
            (header.agent_id, ServerClientMsg::Game (envelope).to_bytes().map_err(msgs::MsgError::from)?)
        }
        ClientType::Agent => {
            let mut stamped = envelope.to_vec();
            Envelope::restamp(&mut stamped, sender)?;
            (GAME_MASTER_HOST_ID, ServerClientMsg::Game (&stamped).to_bytes().map_err(msgs::MsgError::from)?)
        }
    };

    let peer = mapping.peer_for(destination).ok_or(ConnectionError::UnknownHost(destination))?;
    peer.outbox.send(bytes).map_err(|_| ConnectionError::PeerGone(destination))?;

    tracing::trace!(sender, destination, message_id = %header.message_id, "routed");
    Ok(destination)
}

/// Queues a relay frame for every agent currently registered.
pub fn broadcast_to_agents(mapping: &HostMapping, msg: &ServerClientMsg) {
    let bytes = match msg.to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("could not pack broadcast: {e}");
            return;
        }
    };
    for (host_id, peer) in mapping.agent_peers() {
        if peer.outbox.send(bytes.clone()).is_err() {
            tracing::debug!(host_id, "agent went away before broadcast");
        }
    }
}

#[cfg(test)]
mod tests {
    use msgs::{
        dequeue::dequeue_msg,
        geometry::TeamId,
        payload::{JoinRequest, JoinResponse},
        Message, MessageId, Payload,
    };
    use tokio::sync::mpsc;

    use super::*;

    fn game_body(frame: &[u8]) -> Vec<u8> {
        let (begin, end) = dequeue_msg(frame).unwrap().unwrap();
        match ServerClientMsg::decode(&frame[begin..end]).unwrap() {
            ServerClientMsg::Game (bytes) => bytes.to_vec(),
            other => panic!("expected a game frame, got {other:?}"),
        }
    }

    #[test]
    fn agent_identity_is_stamped_by_the_relay() {
        let mapping = HostMapping::new();
        let (gm_tx, mut gm_rx) = mpsc::unbounded_channel();
        mapping.register(1, ClientType::GameMaster, gm_tx).unwrap();
        let agent = mapping.register(2, ClientType::Agent, mpsc::unbounded_channel().0).unwrap();

        let spoofed = Message::new(42, Payload::JoinRequest (JoinRequest { team_id: TeamId::Red, wants_to_be_leader: true }));
        let destination = route(&mapping, agent, ClientType::Agent, &spoofed.encode().unwrap()).unwrap();
        assert_eq!(destination, GAME_MASTER_HOST_ID);

        let received = Message::decode(&game_body(&gm_rx.try_recv().unwrap())).unwrap();
        assert_eq!(received.agent_id, agent);
        assert_eq!(received.message_id(), MessageId::JoinRequest);
    }

    #[test]
    fn game_master_addresses_agents_by_id() {
        let mapping = HostMapping::new();
        mapping.register(1, ClientType::GameMaster, mpsc::unbounded_channel().0).unwrap();
        let (agent_tx, mut agent_rx) = mpsc::unbounded_channel();
        let agent = mapping.register(2, ClientType::Agent, agent_tx).unwrap();

        let response = Message::new(agent, Payload::JoinResponse (JoinResponse { accepted: true, agent_id: agent }));
        route(&mapping, GAME_MASTER_HOST_ID, ClientType::GameMaster, &response.encode().unwrap()).unwrap();
        assert_eq!(Message::decode(&game_body(&agent_rx.try_recv().unwrap())).unwrap(), response);
    }

    #[test]
    fn unknown_destination_is_dropped() {
        let mapping = HostMapping::new();
        mapping.register(1, ClientType::GameMaster, mpsc::unbounded_channel().0).unwrap();
        let message = Message::new(17, Payload::PauseGame).encode().unwrap();
        assert!(matches!(
            route(&mapping, GAME_MASTER_HOST_ID, ClientType::GameMaster, &message),
            Err(ConnectionError::UnknownHost(17))
        ));
    }

    #[test]
    fn agent_traffic_without_a_game_master_is_unroutable() {
        let mapping = HostMapping::new();
        let agent = mapping.register(3, ClientType::Agent, mpsc::unbounded_channel().0).unwrap();
        let message = Message::new(agent, Payload::DiscoverRequest).encode().unwrap();
        assert!(matches!(
            route(&mapping, agent, ClientType::Agent, &message),
            Err(ConnectionError::UnknownHost(GAME_MASTER_HOST_ID))
        ));
    }

    #[test]
    fn unknown_message_id_is_malformed() {
        let mapping = HostMapping::new();
        let agent = mapping.register(3, ClientType::Agent, mpsc::unbounded_channel().0).unwrap();
        let mut bytes = vec![0xff; 8];
        bytes.extend_from_slice(b"{}");
        assert!(matches!(route(&mapping, agent, ClientType::Agent, &bytes), Err(ConnectionError::Malformed(_))));
    }

    #[test]
    fn send_to_a_closed_peer_fails_locally() {
        let mapping = HostMapping::new();
        let (gm_tx, gm_rx) = mpsc::unbounded_channel();
        mapping.register(1, ClientType::GameMaster, gm_tx).unwrap();
        drop(gm_rx);
        let agent = mapping.register(2, ClientType::Agent, mpsc::unbounded_channel().0).unwrap();
        let message = Message::new(agent, Payload::DiscoverRequest).encode().unwrap();
        assert!(matches!(route(&mapping, agent, ClientType::Agent, &message), Err(ConnectionError::PeerGone(0))));
    }
}
