// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-process transport running a simulated device on a blocking thread

use std::{sync::mpsc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc::UnboundedReceiver, Mutex},
    task::JoinHandle,
};

use ota_client::{Error, Exchange};
use ota_proto::OtaStatus;

use crate::{Device, QueueChannel, SimConfirm, SimDriver, SimUi};

/// Device state returned when a [Loopback] is shut down
pub struct Finished {
    pub drv: SimDriver,
    pub ui: SimUi,
    pub sessions: Vec<OtaStatus>,
}

/// [Exchange] implementation backed by an in-process [Device]
pub struct Loopback {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    rx: Mutex<UnboundedReceiver<Vec<u8>>>,
    task: JoinHandle<Finished>,
}

impl Loopback {
    /// Start a device on the tokio blocking pool (requires a runtime context)
    pub fn spawn(drv: SimDriver, ui: SimUi, confirm: SimConfirm) -> Self {
        let (req_tx, req_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = tokio::sync::mpsc::unbounded_channel();

        let task = tokio::task::spawn_blocking(move || {
            let mut d = Device::new(drv, QueueChannel::new(req_rx, resp_tx), ui, confirm);
            d.serve();

            let sessions = d.sessions().to_vec();
            let (drv, _ch, ui, _confirm) = d.into_parts();

            Finished { drv, ui, sessions }
        });

        Self {
            tx: Some(req_tx),
            rx: Mutex::new(resp_rx),
            task,
        }
    }

    /// Close the channel and collect device state
    pub async fn shutdown(mut self) -> anyhow::Result<Finished> {
        self.tx.take();

        let f = self.task.await?;

        Ok(f)
    }
}

#[async_trait]
impl Exchange for Loopback {
    async fn exchange(&self, frame: &[u8], timeout: Duration) -> Result<Vec<u8>, Error> {
        self.tx
            .as_ref()
            .ok_or(Error::Closed)?
            .send(frame.to_vec())
            .map_err(|_| Error::Closed)?;

        let mut rx = self.rx.lock().await;
        let r = tokio::time::timeout(timeout, rx.recv()).await?;

        r.ok_or(Error::Closed)
    }
}
