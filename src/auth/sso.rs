//! Interactive single sign-on handshake
//!
//! First-time logins go through the identity provider's own login form,
//! which computes two extra fingerprint values in the browser when the
//! form is submitted. The client cannot compute those itself, so this
//! module defines a handshake with whatever surface is hosting that form:
//! the client sends prefill values over, the host hands the captured form
//! fields back. The real login then runs out-of-band with the full
//! credential.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::api::error::{ApiError, ApiResult, FailReason};

/// How long the host surface gets before the handshake gives up
const SSO_TIMEOUT: Duration = Duration::from_secs(300);

/// Values the host prefills into the identity provider's login form
#[derive(Debug, Clone)]
pub struct SsoPrefill {
    pub username: String,
    pub password: String,
    /// Device fingerprint injected into the form's hidden field
    pub fingerprint: String,
}

/// What the host surface reports back
#[derive(Debug, Clone)]
pub enum SsoEvent {
    /// The form was submitted; these are its generated hidden fields
    FormCaptured {
        finger_gen_print: String,
        finger_gen_print3: String,
    },
    /// The surface hit an error it could not recover from
    Failed(String),
    /// The user backed out
    Cancelled,
}

/// Complete fingerprint set produced by a successful handshake
#[derive(Debug, Clone)]
pub struct SsoFields {
    pub fingerprint: String,
    pub finger_gen_print: String,
    pub finger_gen_print3: String,
}

/// A surface that can run the identity provider's login form
#[allow(async_fn_in_trait)]
pub trait InteractiveAuth {
    /// Run the form once and capture its generated fields
    async fn acquire(&mut self, prefill: SsoPrefill) -> ApiResult<SsoFields>;
}

/// Channel-backed [`InteractiveAuth`] for out-of-process host surfaces
pub struct SsoHandshake {
    prefill_tx: mpsc::Sender<SsoPrefill>,
    event_rx: mpsc::Receiver<SsoEvent>,
    timeout: Duration,
}

/// Host side of the handshake: receives prefill, reports events
pub struct SsoHost {
    prefill_rx: mpsc::Receiver<SsoPrefill>,
    event_tx: mpsc::Sender<SsoEvent>,
}

/// Create a connected handshake/host pair
pub fn sso_channel() -> (SsoHandshake, SsoHost) {
    let (prefill_tx, prefill_rx) = mpsc::channel(1);
    let (event_tx, event_rx) = mpsc::channel(4);
    (
        SsoHandshake {
            prefill_tx,
            event_rx,
            timeout: SSO_TIMEOUT,
        },
        SsoHost {
            prefill_rx,
            event_tx,
        },
    )
}

impl SsoHandshake {
    /// Override the handshake timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl InteractiveAuth for SsoHandshake {
    async fn acquire(&mut self, prefill: SsoPrefill) -> ApiResult<SsoFields> {
        let fingerprint = prefill.fingerprint.clone();

        if self.prefill_tx.send(prefill).await.is_err() {
            return Err(ApiError::with_extra(
                FailReason::OperationFailed,
                "sign-on surface went away",
            ));
        }

        let event = tokio::time::timeout(self.timeout, self.event_rx.recv())
            .await
            .map_err(|_| {
                ApiError::with_extra(FailReason::OperationFailed, "single sign-on timed out")
            })?;

        match event {
            Some(SsoEvent::FormCaptured {
                finger_gen_print,
                finger_gen_print3,
            }) => {
                info!(
                    has_finger_gen_print = !finger_gen_print.is_empty(),
                    has_finger_gen_print3 = !finger_gen_print3.is_empty(),
                    "sign-on form captured"
                );
                Ok(SsoFields {
                    fingerprint,
                    finger_gen_print,
                    finger_gen_print3,
                })
            }
            Some(SsoEvent::Failed(message)) => {
                Err(ApiError::with_extra(FailReason::OperationFailed, message))
            }
            Some(SsoEvent::Cancelled) => Err(ApiError::with_extra(
                FailReason::OperationFailed,
                "single sign-on cancelled",
            )),
            None => Err(ApiError::with_extra(
                FailReason::OperationFailed,
                "sign-on surface went away",
            )),
        }
    }
}

impl SsoHost {
    /// Wait for the prefill values; `None` means the client gave up
    pub async fn next_prefill(&mut self) -> Option<SsoPrefill> {
        self.prefill_rx.recv().await
    }

    /// Report the captured form fields
    pub async fn capture(&self, finger_gen_print: String, finger_gen_print3: String) {
        let _ = self
            .event_tx
            .send(SsoEvent::FormCaptured {
                finger_gen_print,
                finger_gen_print3,
            })
            .await;
    }

    /// Report a failure or cancellation
    pub async fn abort(&self, event: SsoEvent) {
        let _ = self.event_tx.send(event).await;
    }
}
