//! End-to-end tests: a relay served on a loopback port, driven by real
//! `RelayClient`s over WebSocket.

mod helpers;

mod auth_test;
mod notification_test;
mod presence_test;
mod reconnect_test;
mod room_test;
mod session_test;
