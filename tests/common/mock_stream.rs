// tests/common/mock_stream.rs
//! Injectable detection-stream sources.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::mpsc;

use critterwatch::notify::stream::DetectionStream;
use critterwatch::notify::ChannelError;

/// A stream that replays a fixed script and then disconnects.
pub struct ScriptedStream {
    frames: VecDeque<Result<String, ChannelError>>,
    fail_connect: Option<String>,
}

impl ScriptedStream {
    pub fn new<I, S>(frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: frames.into_iter().map(|f| Ok(f.into())).collect(),
            fail_connect: None,
        }
    }

    pub fn failing_connect(reason: &str) -> Self {
        Self {
            frames: VecDeque::new(),
            fail_connect: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl DetectionStream for ScriptedStream {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        match self.fail_connect.take() {
            Some(reason) => Err(ChannelError::Connect(reason)),
            None => Ok(()),
        }
    }

    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>> {
        self.frames.pop_front()
    }
}

/// A stream driven frame by frame from the test. Dropping the script handle
/// disconnects the stream.
pub struct PipedStream {
    rx: mpsc::Receiver<Result<String, ChannelError>>,
}

pub struct StreamScript {
    tx: mpsc::Sender<Result<String, ChannelError>>,
}

impl PipedStream {
    pub fn new() -> (Self, StreamScript) {
        let (tx, rx) = mpsc::channel(16);
        (Self { rx }, StreamScript { tx })
    }
}

impl StreamScript {
    pub async fn send(&self, frame: &str) {
        self.tx
            .send(Ok(frame.to_string()))
            .await
            .expect("stream channel gone");
    }

    pub async fn send_error(&self, message: &str) {
        self.tx
            .send(Err(ChannelError::Stream(message.to_string())))
            .await
            .expect("stream channel gone");
    }
}

#[async_trait]
impl DetectionStream for PipedStream {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, ChannelError>> {
        self.rx.recv().await
    }
}
