//! The [`SigningPool`] and its worker threads.

use crate::{AccountSeed, SignerError, ss58_encode};
use archivist_protocol::blake2_256;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

/// Payloads longer than this are hashed before signing.
pub const MAX_UNHASHED_PAYLOAD: usize = 256;

#[derive(Debug)]
struct SigningRequest {
    id: u64,
    payload: Vec<u8>,
}

#[derive(Debug)]
struct SigningResponse {
    id: u64,
    signature: Signature,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Signature>>>>;

/// A fixed set of OS threads signing payloads with one account key.
///
/// Dropping the pool closes every worker channel; the threads and the dispatcher task then exit.
#[derive(Debug)]
pub struct SigningPool {
    workers: Vec<mpsc::UnboundedSender<SigningRequest>>,
    next_worker: AtomicUsize,
    next_id: AtomicU64,
    pending: PendingMap,
    public_key: VerifyingKey,
    dispatcher: JoinHandle<()>,
}

impl SigningPool {
    /// Spawns `size` signing threads for the account derived from `seed`.
    ///
    /// The key pair is only ever derived on the worker threads. Worker 0 derives it right away
    /// and reports the public key back. Must be called from within a tokio runtime, which hosts
    /// the response dispatcher.
    pub async fn new(seed: AccountSeed, size: usize) -> Result<Self, SignerError> {
        if size == 0 {
            return Err(SignerError::NoWorkers);
        }

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (key_tx, key_rx) = oneshot::channel();
        let mut key_tx = Some(key_tx);
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let (request_tx, request_rx) = mpsc::unbounded_channel();
            let responses = response_tx.clone();
            let public_key = key_tx.take();
            thread::Builder::new()
                .name(format!("archivist-signer-{index}"))
                .spawn(move || run_worker(index, seed, public_key, request_rx, responses))
                .map_err(|err| SignerError::Spawn(err.to_string()))?;
            workers.push(request_tx);
        }
        let public_key = key_rx.await.map_err(|_| SignerError::WorkerStopped(0))?;

        let pending = PendingMap::default();
        let dispatcher = tokio::spawn(dispatch(response_rx, Arc::clone(&pending)));
        debug!(target: "signer", workers = size, "Started signing pool");

        Ok(Self {
            workers,
            next_worker: AtomicUsize::new(0),
            next_id: AtomicU64::new(0),
            pending,
            public_key,
            dispatcher,
        })
    }

    /// The number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// The account's public key.
    pub const fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// The account's SS58 address under `prefix`.
    pub fn address(&self, prefix: u16) -> String {
        ss58_encode(self.public_key.as_bytes(), prefix)
    }

    /// Signs `payload` on one of the workers.
    ///
    /// Payloads longer than [`MAX_UNHASHED_PAYLOAD`] bytes are hashed with blake2b-256 and the
    /// digest is signed instead.
    pub async fn sign(&self, payload: &[u8]) -> Result<Signature, SignerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).insert(id, tx);

        let worker = self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let request = SigningRequest { id, payload: payload.to_vec() };
        if self.workers[worker].send(request).is_err() {
            self.pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
            return Err(SignerError::WorkerStopped(worker));
        }
        trace!(target: "signer", id, worker, "Dispatched signing request");

        rx.await.map_err(|_| SignerError::RequestDropped(id))
    }
}

impl Drop for SigningPool {
    fn drop(&mut self) {
        self.workers.clear();
        self.dispatcher.abort();
    }
}

/// Returns the bytes actually signed for `payload`.
pub fn signing_payload(payload: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    if payload.len() > MAX_UNHASHED_PAYLOAD {
        blake2_256(payload).to_vec().into()
    } else {
        payload.into()
    }
}

/// Checks `signature` over `payload` the way [`SigningPool::sign`] produced it.
pub fn verify_signature(public_key: &VerifyingKey, payload: &[u8], signature: &Signature) -> bool {
    public_key.verify(&signing_payload(payload), signature).is_ok()
}

fn run_worker(
    index: usize,
    seed: AccountSeed,
    public_key: Option<oneshot::Sender<VerifyingKey>>,
    mut requests: mpsc::UnboundedReceiver<SigningRequest>,
    responses: mpsc::UnboundedSender<SigningResponse>,
) {
    let mut key: Option<SigningKey> = None;
    if let Some(public_key) = public_key {
        let key = key.insert(seed.signing_key());
        if public_key.send(key.verifying_key()).is_err() {
            return;
        }
    }
    while let Some(SigningRequest { id, payload }) = requests.blocking_recv() {
        let key = key.get_or_insert_with(|| seed.signing_key());
        let signature = key.sign(&signing_payload(&payload));
        if responses.send(SigningResponse { id, signature }).is_err() {
            break;
        }
    }
    debug!(target: "signer", worker = index, "Signing worker stopped");
}

async fn dispatch(mut responses: mpsc::UnboundedReceiver<SigningResponse>, pending: PendingMap) {
    while let Some(SigningResponse { id, signature }) = responses.recv().await {
        let waiter = pending.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
        match waiter {
            // The caller may have given up; nothing to deliver then.
            Some(waiter) => {
                let _ = waiter.send(signature);
            }
            None => warn!(target: "signer", id, "Signature for unknown request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    fn seed() -> AccountSeed {
        AccountSeed::new([7u8; 32])
    }

    #[tokio::test]
    async fn test_rejects_empty_pool() {
        assert_eq!(SigningPool::new(seed(), 0).await.unwrap_err(), SignerError::NoWorkers);
    }

    #[tokio::test]
    async fn test_signature_verifies() {
        let pool = SigningPool::new(seed(), 1).await.unwrap();
        let signature = pool.sign(b"hello").await.unwrap();

        assert_eq!(pool.public_key(), &seed().public_key());
        assert!(verify_signature(pool.public_key(), b"hello", &signature));
        assert!(pool.public_key().verify(b"hello", &signature).is_ok());
        assert!(!verify_signature(pool.public_key(), b"hellp", &signature));
    }

    #[tokio::test]
    async fn test_long_payloads_are_hashed() {
        let pool = SigningPool::new(seed(), 2).await.unwrap();
        let payload = vec![0xab; MAX_UNHASHED_PAYLOAD + 1];
        let signature = pool.sign(&payload).await.unwrap();

        assert!(pool.public_key().verify(blake2_256(&payload).as_slice(), &signature).is_ok());
        assert!(pool.public_key().verify(&payload, &signature).is_err());

        let boundary = vec![0xab; MAX_UNHASHED_PAYLOAD];
        let signature = pool.sign(&boundary).await.unwrap();
        assert!(pool.public_key().verify(&boundary, &signature).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_are_correlated() {
        const REQUESTS: usize = 200;
        let pool = SigningPool::new(seed(), 4).await.unwrap();
        let payloads = (0..REQUESTS)
            .map(|i| {
                let mut payload = format!("payload-{i}").into_bytes();
                // Mix short and hashed payloads.
                if i % 3 == 0 {
                    payload.resize(300 + i, i as u8);
                }
                payload
            })
            .collect::<Vec<_>>();

        let signatures = join_all(payloads.iter().map(|payload| pool.sign(payload))).await;

        for (payload, signature) in payloads.iter().zip(signatures) {
            assert!(verify_signature(pool.public_key(), payload, &signature.unwrap()));
        }
        assert!(pool.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_public_key_comes_from_a_worker() {
        let pool = SigningPool::new(seed(), 3).await.unwrap();
        assert_eq!(pool.public_key(), &seed().public_key());

        // Workers other than the first derive the key on their first request.
        for _ in 0..3 {
            let signature = pool.sign(b"round robin").await.unwrap();
            assert!(verify_signature(pool.public_key(), b"round robin", &signature));
        }
    }

    #[tokio::test]
    async fn test_address_uses_prefix() {
        let pool = SigningPool::new(seed(), 1).await.unwrap();
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.address(42), ss58_encode(seed().public_key().as_bytes(), 42));
        assert_ne!(pool.address(42), pool.address(0));
    }
}
