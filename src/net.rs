//! Listener construction shared by all bindings.

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use tokio::net::TcpListener;

/// Pending-connection backlog for every listener
const LISTEN_BACKLOG: i32 = 1024;

/// Resolve `addr` and bind a non-blocking listener with `SO_REUSEADDR`,
/// so a restarted server does not trip over sockets in `TIME_WAIT`.
pub fn bind_listener(addr: &str) -> io::Result<TcpListener> {
    let addr = resolve(addr)?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    TcpListener::from_std(socket.into())
}

fn resolve(addr: &str) -> io::Result<SocketAddr> {
    addr.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("address '{addr}' did not resolve"),
        )
    })
}
