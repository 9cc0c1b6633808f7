use super::BindingContext;
use super::codec;
use super::schema::Schema;
use crate::core::{Result, Table};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Type-erased view of one bound object.
#[async_trait]
pub(crate) trait BoundSlot: Send + Sync {
    fn sub_key(&self) -> &str;

    fn is_retrieved(&self) -> bool;

    /// Raw stored sub-record kept after a failed decode.
    fn undecoded(&self) -> Option<Table>;

    async fn decode(&self, stored: Table, ctx: &BindingContext) -> Result<String>;

    async fn encode(&self) -> Result<Table>;
}

pub(crate) struct TypedSlot<T> {
    sub_key: String,
    handle: Arc<AsyncMutex<T>>,
    schema: Schema<T>,
    retrieved: AtomicBool,
    undecoded: Mutex<Option<Table>>,
}

impl<T> TypedSlot<T> {
    pub(crate) fn new(sub_key: String, handle: Arc<AsyncMutex<T>>, schema: Schema<T>) -> Self {
        Self {
            sub_key,
            handle,
            schema,
            retrieved: AtomicBool::new(false),
            undecoded: Mutex::new(None),
        }
    }

    fn set_undecoded(&self, value: Option<Table>) {
        *self.undecoded.lock().unwrap_or_else(|err| err.into_inner()) = value;
    }
}

#[async_trait]
impl<T> BoundSlot for TypedSlot<T>
where
    T: Send + 'static,
{
    fn sub_key(&self) -> &str {
        &self.sub_key
    }

    fn is_retrieved(&self) -> bool {
        self.retrieved.load(Ordering::SeqCst)
    }

    fn undecoded(&self) -> Option<Table> {
        self.undecoded
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    async fn decode(&self, stored: Table, ctx: &BindingContext) -> Result<String> {
        let raw = stored.clone();
        let result = {
            let mut obj = self.handle.lock().await;
            codec::decode(&mut *obj, &self.schema, stored, ctx, &self.sub_key)
        };

        match result {
            Ok(tag) => {
                self.set_undecoded(None);
                self.retrieved.store(true, Ordering::SeqCst);
                Ok(tag)
            }
            Err(err) => {
                self.set_undecoded(Some(raw));
                self.retrieved.store(false, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    async fn encode(&self) -> Result<Table> {
        let obj = self.handle.lock().await;
        codec::encode(&*obj, &self.schema, &self.sub_key)
    }
}
