//! Client side of the 4-byte wire protocol

use crate::ClientError;
use log::{debug, info};
use shared::{decode_score, Command, Frame, FRAME_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Connects to the server and splits the stream into its two directions.
pub async fn connect(
    addr: &str,
) -> Result<(ScoreReader<OwnedReadHalf>, CommandWriter<OwnedWriteHalf>), ClientError> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        })?;
    stream.set_nodelay(true)?;
    info!("Connected to {}", addr);

    let (reader, writer) = stream.into_split();
    Ok((ScoreReader::new(reader), CommandWriter::new(writer)))
}

pub struct CommandWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> CommandWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send(&mut self, command: Command) -> Result<(), ClientError> {
        self.writer.write_all(&command.encode()).await?;
        debug!("Sent {:?}", command);
        Ok(())
    }
}

pub struct ScoreReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> ScoreReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Waits for the next score. `Ok(None)` when the server closed the
    /// connection.
    pub async fn next_score(&mut self) -> Result<Option<i32>, ClientError> {
        let mut frame: Frame = [0; FRAME_LEN];
        match self.reader.read_exact(&mut frame).await {
            Ok(_) => {
                let score = decode_score(frame);
                debug!("Received score {}", score);
                Ok(Some(score))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
