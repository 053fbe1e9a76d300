//! Image port: request/reply channel to the owner of the I/O image.

use plc_common::io::image::{ImageOp, ImageReply};
use tokio::sync::{mpsc, oneshot};

use crate::error::ModbusError;

/// Default depth of the request queue.
pub const DEFAULT_PORT_CAPACITY: usize = 64;

/// One image operation with its reply slot.
#[derive(Debug)]
pub struct ImageRequest {
    pub op: ImageOp,
    pub reply: oneshot::Sender<ImageReply>,
}

impl ImageRequest {
    /// Answer the request. A caller that stopped waiting is ignored.
    pub fn respond(self, reply: ImageReply) {
        let _ = self.reply.send(reply);
    }
}

/// Cloneable sending side of the port.
#[derive(Debug, Clone)]
pub struct ImagePort {
    tx: mpsc::Sender<ImageRequest>,
}

impl ImagePort {
    /// Create a port and the receiver the image owner polls.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ImageRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Send `op` and wait for the reply.
    pub async fn call(&self, op: ImageOp) -> Result<ImageReply, ModbusError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ImageRequest { op, reply })
            .await
            .map_err(|_| ModbusError::EngineGone)?;
        rx.await.map_err(|_| ModbusError::EngineGone)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plc_common::io::image::IoImage;

    #[tokio::test]
    async fn call_round_trips_through_owner() {
        let (port, mut rx) = ImagePort::channel(4);
        let owner = tokio::spawn(async move {
            let mut image = IoImage::new();
            while let Some(req) = rx.recv().await {
                let reply = image.apply(&req.op);
                req.respond(reply);
            }
            image
        });

        let reply = port
            .call(ImageOp::WriteInputs {
                start: 3,
                values: vec![true, true],
            })
            .await
            .unwrap();
        assert_eq!(reply, ImageReply::Written(2));

        let reply = port
            .call(ImageOp::ReadCoils {
                start: 3,
                quantity: 2,
            })
            .await
            .unwrap();
        assert_eq!(reply, ImageReply::Bits(vec![false, false]));

        drop(port);
        let image = owner.await.unwrap();
        assert!(image.inputs()[3] && image.inputs()[4]);
    }

    #[tokio::test]
    async fn call_fails_when_owner_is_gone() {
        let (port, rx) = ImagePort::channel(1);
        drop(rx);
        assert!(port.is_closed());
        let err = port
            .call(ImageOp::ReadRegisters {
                start: 0,
                quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ModbusError::EngineGone));
    }
}
