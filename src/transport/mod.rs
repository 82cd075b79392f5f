pub mod channel;
pub mod connection;
pub mod traits;
pub mod websocket;

pub use channel::{ChannelAcceptor, ChannelConnector, ChannelPeer};
pub use connection::{TransportConnection, TransportEvent, TransportEventKind, TransportHandle};
pub use traits::{Incoming, TextStream, TransportConnector};
pub use websocket::{WebSocketConnector, WebSocketTextStream};
