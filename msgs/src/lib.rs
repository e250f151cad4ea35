//! Wire protocol shared by the communication server, the game master and the agents.
//!
//! Two layers travel over every socket: relay frames ([`client_server_msg`],
//! [`server_client_msg`]) understood by the communication server, and game
//! envelopes ([`message`]) carried inside `Game` frames and only routed by
//! their header.

pub mod client_server_msg;
pub mod client_type;
pub mod config_file;
pub mod dequeue;
pub mod error;
pub mod geometry;
pub mod logger;
pub mod matrix;
pub mod message;
pub mod message_id;
pub mod payload;
pub mod relay_server_connection_process;
pub mod server_client_msg;

pub use error::MsgError;
pub use message::{Envelope, Message, Payload};
pub use message_id::MessageId;
