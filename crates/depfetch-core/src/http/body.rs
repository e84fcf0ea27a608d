//! Pull-style response body fed by the libcurl transfer thread.

use std::io::{self, Read};
use std::sync::mpsc::Receiver;

/// What the transfer thread sends after the headers.
pub(crate) enum BodyFrame {
    Data(Vec<u8>),
    /// The transfer failed after the headers were delivered.
    Failed(String),
}

/// `Read` over the frames of one transfer. Ends (returns `Ok(0)`) when the
/// transfer thread drops its sender after a clean finish. Dropping the body
/// disconnects the channel, which aborts the transfer.
pub(crate) struct ChannelBody {
    frames: Receiver<BodyFrame>,
    current: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl ChannelBody {
    pub(crate) fn new(frames: Receiver<BodyFrame>) -> Self {
        Self {
            frames,
            current: Vec::new(),
            pos: 0,
            finished: false,
        }
    }
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.current.len() {
            if self.finished {
                return Ok(0);
            }
            match self.frames.recv() {
                Ok(BodyFrame::Data(data)) => {
                    self.current = data;
                    self.pos = 0;
                }
                Ok(BodyFrame::Failed(message)) => {
                    self.finished = true;
                    return Err(io::Error::new(io::ErrorKind::ConnectionAborted, message));
                }
                Err(_) => {
                    self.finished = true;
                    return Ok(0);
                }
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn reads_frames_in_order_then_eof() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(BodyFrame::Data(b"hello ".to_vec())).unwrap();
        tx.send(BodyFrame::Data(Vec::new())).unwrap();
        tx.send(BodyFrame::Data(b"world".to_vec())).unwrap();
        drop(tx);
        let mut body = ChannelBody::new(rx);
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello world");
        assert_eq!(body.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn failure_frame_surfaces_as_error() {
        let (tx, rx) = mpsc::sync_channel(4);
        tx.send(BodyFrame::Data(b"abc".to_vec())).unwrap();
        tx.send(BodyFrame::Failed("connection reset".into())).unwrap();
        let mut body = ChannelBody::new(rx);
        let mut buf = [0u8; 8];
        assert_eq!(body.read(&mut buf).unwrap(), 3);
        let err = body.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
    }
}
