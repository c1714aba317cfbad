//! Server shell: accept loop, connection pool and routing.

pub mod echo;
pub mod listener;
pub mod routes;

pub use echo::EchoSocket;
pub use routes::Routes;
