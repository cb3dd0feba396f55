//! Parallel partition scan.
//!
//! The exchange executor splits the table beneath its input plan into
//! partitions and runs a copy of the input plan for each partition on a pool
//! of worker threads. Rows from all workers are merged through a bounded
//! channel in no particular order.
//!
//! Workers run on a child [`Context`], so closing or dropping the executor
//! stops them without cancelling the caller's query. A worker failure is
//! delivered through the channel and surfaces from `next`.

use crate::catalog::Partition;
use crate::context::Context;
use crate::executor::RowIter;
use crate::plan::{PlanError, PlanNode, TableRef};
use crate::types::Row;
use anyhow::{anyhow, Result};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;

/// Rows buffered between the workers and the consumer
const CHANNEL_CAPACITY: usize = 1024;

type PartitionQueue = Arc<Mutex<VecDeque<Partition>>>;

pub struct ExchangeExecutor {
    /// Context shared by the workers
    ctx: Context,
    receiver: Option<mpsc::Receiver<Result<Row>>>,
    workers: Vec<JoinHandle<()>>,
}

impl ExchangeExecutor {
    /// Start up to `parallelism` workers over the partitions of the table
    /// scanned by `input`.
    pub fn new(ctx: &Context, input: &PlanNode, parallelism: usize) -> Result<Self> {
        let table = input
            .find_table()
            .cloned()
            .ok_or_else(|| PlanError::MissingTable(input.node_name().to_string()))?;

        let mut queue = VecDeque::new();
        let mut partitions = table.partitions(ctx)?;
        while let Some(partition) = partitions.next()? {
            queue.push_back(partition);
        }
        partitions.close()?;

        let worker_count = parallelism.max(1).min(queue.len());
        debug!(
            "exchange over {}: {} partitions, {} workers",
            table.name(),
            queue.len(),
            worker_count
        );

        let worker_ctx = ctx.child();
        let queue: PartitionQueue = Arc::new(Mutex::new(queue));
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);

        let mut executor = Self {
            ctx: worker_ctx,
            receiver: Some(receiver),
            workers: Vec::with_capacity(worker_count),
        };
        for id in 0..worker_count {
            let worker = Worker {
                id,
                ctx: executor.ctx.clone(),
                plan: input.clone(),
                table: table.clone(),
                queue: Arc::clone(&queue),
                sender: sender.clone(),
            };
            let handle = std::thread::Builder::new()
                .name(format!("exchange-{}", id))
                .spawn(move || worker.run())?;
            executor.workers.push(handle);
        }
        Ok(executor)
    }

    fn join_workers(&mut self) -> Result<()> {
        let mut panicked = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        if panicked > 0 {
            return Err(anyhow!("{} exchange worker(s) panicked", panicked));
        }
        Ok(())
    }
}

impl RowIter for ExchangeExecutor {
    fn next(&mut self) -> Result<Option<Row>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Ok(None);
        };
        // Buffered rows must not outlive a cancellation
        self.ctx.check_cancelled()?;
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(anyhow!(
                "exchange rows cannot be pulled from an async task; use spawn_blocking"
            ));
        }
        match receiver.blocking_recv() {
            Some(row) => row.map(Some),
            None => {
                // Every worker has finished
                self.receiver = None;
                self.join_workers()?;
                self.ctx.check_cancelled()?;
                Ok(None)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.ctx.cancel();
        if let Some(mut receiver) = self.receiver.take() {
            // Unblocks workers waiting for channel capacity
            receiver.close();
        }
        self.join_workers()
    }
}

impl Drop for ExchangeExecutor {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to stop exchange workers: {}", e);
        }
    }
}

struct Worker {
    id: usize,
    ctx: Context,
    plan: PlanNode,
    table: TableRef,
    queue: PartitionQueue,
    sender: mpsc::Sender<Result<Row>>,
}

impl Worker {
    fn run(self) {
        trace!("exchange worker {} started", self.id);
        loop {
            if self.ctx.is_cancelled() {
                break;
            }
            let Some(partition) = self.queue.lock().pop_front() else {
                break;
            };
            trace!("exchange worker {} scanning partition {}", self.id, partition);

            match self.scan(partition) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    if !self.ctx.is_cancelled() {
                        warn!("exchange worker {} failed: {}", self.id, e);
                        let _ = self.sender.blocking_send(Err(e));
                    }
                    break;
                }
            }
        }
        trace!("exchange worker {} finished", self.id);
    }

    /// Send every row of one partition. Returns false once the consumer is gone.
    fn scan(&self, partition: Partition) -> Result<bool> {
        let table = &self.table;
        let plan = self.plan.transform_up(&|node| match node {
            PlanNode::ResolvedTable { table: t } if &t == table => Ok(PlanNode::PartitionScan {
                table: t,
                partition: partition.clone(),
            }),
            other => Ok(other),
        })?;

        let mut rows = plan.row_iter(&self.ctx)?;
        while let Some(row) = rows.next()? {
            if self.sender.blocking_send(Ok(row)).is_err() {
                rows.close()?;
                return Ok(false);
            }
        }
        rows.close()?;
        Ok(true)
    }
}
