mod export;
mod observers;
mod probing;
mod sockets;
