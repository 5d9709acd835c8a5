use std::sync::Arc;

use bastion_types::{Identity, Selector, SignedMetaTx, TxId, TxParams, TxRecord};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::SecureOperationEngine;
use crate::error::EngineResult;
use crate::metatx::RelayContext;

/// Shared handle to one engine.
///
/// Every mutation holds the write lock for the whole call, so entry points
/// stay serialized; reads share the lock and see a consistent snapshot.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<RwLock<SecureOperationEngine>>,
}

impl EngineHandle {
    pub fn new(engine: SecureOperationEngine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, SecureOperationEngine> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, SecureOperationEngine> {
        self.inner.write().await
    }

    pub async fn create(&self, handler: Selector, params: TxParams) -> EngineResult<TxId> {
        self.inner.write().await.create(handler, params)
    }

    pub async fn approve_by_timelock(&self, id: TxId, caller: Identity) -> EngineResult<TxRecord> {
        self.inner.write().await.approve_by_timelock(id, caller)
    }

    pub async fn cancel_by_timelock(&self, id: TxId, caller: Identity) -> EngineResult<TxRecord> {
        self.inner.write().await.cancel_by_timelock(id, caller)
    }

    pub async fn approve_by_meta_tx(
        &self,
        tx: SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        self.inner.write().await.approve_by_meta_tx(&tx, relay)
    }

    pub async fn cancel_by_meta_tx(
        &self,
        tx: SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        self.inner.write().await.cancel_by_meta_tx(&tx, relay)
    }

    pub async fn request_and_approve_by_meta_tx(
        &self,
        tx: SignedMetaTx,
        relay: RelayContext,
    ) -> EngineResult<TxRecord> {
        self.inner
            .write()
            .await
            .request_and_approve_by_meta_tx(&tx, relay)
    }

    pub async fn get_transaction(&self, id: TxId) -> EngineResult<TxRecord> {
        self.inner.read().await.get_transaction(id).cloned()
    }

    pub async fn list_pending(&self) -> Vec<TxId> {
        self.inner.read().await.list_pending()
    }

    pub async fn nonce(&self, signer: Identity) -> u64 {
        self.inner.read().await.nonce(&signer)
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}
