//! The transaction-queue boundary.
//!
//! A queue implementation owns the worker thread and the connection; this
//! module defines the work items it runs and the operations it must offer.
//! Work items run strictly one at a time per queue, so nothing here locks.

use dbflow_core::{DatabaseWrapper, Error, Model, Result};

use crate::definition::in_transaction;
use crate::persistence::ModelPersistence;

/// Work executed against a connection handle.
pub trait Transaction: Send {
    fn execute(&mut self, db: &dyn DatabaseWrapper) -> Result<()>;
}

impl<F> Transaction for F
where
    F: FnMut(&dyn DatabaseWrapper) -> Result<()> + Send,
{
    fn execute(&mut self, db: &dyn DatabaseWrapper) -> Result<()> {
        self(db)
    }
}

type SuccessCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(&Error) + Send>;

/// A [`Transaction`] with its name and callbacks, as handed to a queue.
pub struct QueuedTransaction {
    name: Option<String>,
    transaction: Box<dyn Transaction>,
    run_in_transaction: bool,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl std::fmt::Debug for QueuedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedTransaction")
            .field("name", &self.name)
            .field("run_in_transaction", &self.run_in_transaction)
            .finish_non_exhaustive()
    }
}

impl QueuedTransaction {
    pub fn new(transaction: impl Transaction + 'static) -> Self {
        Self {
            name: None,
            transaction: Box::new(transaction),
            run_in_transaction: true,
            on_success: None,
            on_error: None,
        }
    }

    /// Name used to cancel the work before it runs.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Skip the surrounding BEGIN/END.
    #[must_use]
    pub fn without_transaction(mut self) -> Self {
        self.run_in_transaction = false;
        self
    }

    #[must_use]
    pub fn on_success(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl FnOnce(&Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn task_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Run on the calling thread, then invoke the matching callback.
    ///
    /// The error is handed to the error callback and also returned.
    pub fn run(self, db: &dyn DatabaseWrapper) -> Result<()> {
        let Self {
            name,
            mut transaction,
            run_in_transaction,
            on_success,
            on_error,
        } = self;
        tracing::debug!(name = name.as_deref().unwrap_or("<unnamed>"), "Running transaction");
        let result = if run_in_transaction {
            in_transaction(db, || transaction.execute(db))
        } else {
            transaction.execute(db)
        };
        match &result {
            Ok(()) => {
                if let Some(callback) = on_success {
                    callback();
                }
            }
            Err(err) => {
                tracing::warn!(name = name.as_deref().unwrap_or("<unnamed>"), error = %err, "Transaction failed");
                if let Some(callback) = on_error {
                    callback(err);
                }
            }
        }
        result
    }
}

/// What a background queue implementation offers. Every operation may be
/// called from any thread.
pub trait TransactionQueue: Send + Sync {
    /// Enqueue work; it runs after everything already queued.
    fn add(&self, transaction: QueuedTransaction);

    /// Drop queued work with this name that has not started.
    fn cancel(&self, name: &str);

    /// Stop the worker once the current item finishes.
    fn quit(&self);
}

/// Which persistence operation [`StoreModelsTransaction`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Save,
    Insert,
    Update,
    Delete,
}

/// Persist a batch of models in one transaction.
#[derive(Debug)]
pub struct StoreModelsTransaction<M> {
    operation: StoreOperation,
    models: Vec<M>,
}

impl<M: Model + Send + 'static> StoreModelsTransaction<M> {
    pub fn new(operation: StoreOperation, models: Vec<M>) -> Self {
        Self { operation, models }
    }

    pub fn save(models: Vec<M>) -> Self {
        Self::new(StoreOperation::Save, models)
    }

    pub fn insert(models: Vec<M>) -> Self {
        Self::new(StoreOperation::Insert, models)
    }

    pub fn update(models: Vec<M>) -> Self {
        Self::new(StoreOperation::Update, models)
    }

    pub fn delete(models: Vec<M>) -> Self {
        Self::new(StoreOperation::Delete, models)
    }

    /// Models in their post-operation state.
    pub fn into_models(self) -> Vec<M> {
        self.models
    }
}

impl<M: Model + Send + 'static> Transaction for StoreModelsTransaction<M> {
    fn execute(&mut self, db: &dyn DatabaseWrapper) -> Result<()> {
        tracing::debug!(model = M::NAME, count = self.models.len(), operation = ?self.operation, "Storing models");
        for model in &mut self.models {
            match self.operation {
                StoreOperation::Save => {
                    model.save(db)?;
                }
                StoreOperation::Insert => {
                    model.insert(db)?;
                }
                StoreOperation::Update => {
                    model.update(db)?;
                }
                StoreOperation::Delete => {
                    model.delete(db)?;
                }
            }
        }
        Ok(())
    }
}
