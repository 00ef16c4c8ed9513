use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

/// Opens the byte stream an engine talks over.
#[async_trait]
pub trait Connector: Send + Sync + 'static
{
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    async fn connect(&self, host: &str, port: u16) -> std::io::Result<Self::Stream>;
}

/// Plain TCP
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector
{
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> std::io::Result<TcpStream>
    {
        TcpStream::connect((host, port)).await
    }
}
