//! WebSocket Live Memo Board
//!
//! Streams the memo list to browser clients.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Tracks active connections and the connection limit
//! - **Handler**: Upgrades, mounts a board per connection, tears it down
//! - **Messages**: Defines client and server message formats
//!
//! ## Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//!
//! ws.onopen = () => {
//!   ws.send(JSON.stringify({type: 'add', content: 'Buy milk'}));
//! };
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'memos') render(msg.memos);
//! };
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage};
