use super::{
    wire::{Envelope, Payload, Propose},
    Error, MiningKeySet, Vote,
};
use bytes::Bytes;
use futures::{
    channel::{mpsc, oneshot},
    SinkExt,
};
use shardbft_cryptography::secp256r1;
use tracing::error;

/// A decoded consensus message.
pub struct Message<T> {
    pub chain_key: String,
    pub timeslot: u64,
    pub height: u64,
    pub payload: T,
}

/// Requests that manage the actor itself.
pub enum Control {
    Start {
        response: oneshot::Sender<Result<(), Error>>,
    },
    Stop {
        response: oneshot::Sender<Result<(), Error>>,
    },
    LoadKeys {
        keys: Vec<MiningKeySet>,
    },
    SignData {
        data: Bytes,
        response: oneshot::Sender<Result<secp256r1::Signature, Error>>,
    },
    ValidateData {
        data: Bytes,
        signature: secp256r1::Signature,
        signer: secp256r1::PublicKey,
        response: oneshot::Sender<bool>,
    },
}

/// Mailbox for sending messages to the consensus actor.
#[derive(Clone)]
pub struct Mailbox {
    proposes: mpsc::Sender<Message<Propose>>,
    votes: mpsc::Sender<Message<Vote>>,
    control: mpsc::Sender<Control>,
}

impl Mailbox {
    pub(super) fn new(
        proposes: mpsc::Sender<Message<Propose>>,
        votes: mpsc::Sender<Message<Vote>>,
        control: mpsc::Sender<Control>,
    ) -> Self {
        Self {
            proposes,
            votes,
            control,
        }
    }

    /// Deliver a message received from the network.
    pub async fn deliver(&mut self, envelope: Envelope) {
        let Envelope {
            chain_key,
            timeslot,
            height,
            payload,
        } = envelope;
        let result = match payload {
            Payload::Propose(propose) => {
                self.proposes
                    .send(Message {
                        chain_key,
                        timeslot,
                        height,
                        payload: propose,
                    })
                    .await
            }
            Payload::Vote(vote) => {
                self.votes
                    .send(Message {
                        chain_key,
                        timeslot,
                        height,
                        payload: vote,
                    })
                    .await
            }
        };
        if let Err(err) = result {
            error!(?err, "failed to deliver message");
        }
    }

    async fn request<T>(
        &mut self,
        control: impl FnOnce(oneshot::Sender<T>) -> Control,
    ) -> Result<T, Error> {
        let (response, receiver) = oneshot::channel();
        self.control
            .send(control(response))
            .await
            .map_err(|_| Error::Unexpected("mailbox closed".into()))?;
        receiver
            .await
            .map_err(|_| Error::Unexpected("response dropped".into()))
    }

    /// Begin proposing and voting.
    pub async fn start(&mut self) -> Result<(), Error> {
        self.request(|response| Control::Start { response }).await?
    }

    /// Stop proposing and voting (inbound messages are drained and ignored).
    pub async fn stop(&mut self) -> Result<(), Error> {
        self.request(|response| Control::Stop { response }).await?
    }

    /// Replace the keys used for proposing and voting.
    pub async fn load_keys(&mut self, keys: Vec<MiningKeySet>) -> Result<(), Error> {
        self.control
            .send(Control::LoadKeys { keys })
            .await
            .map_err(|_| Error::Unexpected("mailbox closed".into()))
    }

    /// Sign `data` with the bridge key of the first loaded key set.
    pub async fn sign_data(&mut self, data: Bytes) -> Result<secp256r1::Signature, Error> {
        self.request(|response| Control::SignData { data, response })
            .await?
    }

    /// Verify a bridge signature over `data`.
    pub async fn validate_data(
        &mut self,
        data: Bytes,
        signature: secp256r1::Signature,
        signer: secp256r1::PublicKey,
    ) -> Result<bool, Error> {
        self.request(|response| Control::ValidateData {
            data,
            signature,
            signer,
            response,
        })
        .await
    }
}
