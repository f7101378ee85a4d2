use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};

use crate::core::error::{Error, Result};
use crate::render::host::BlockRenderer;
use crate::render::registry::CanvasRegistry;

/// State owned by the world thread. Block placement and removal corrupt
/// the host renderer unless they happen here, so tasks are the only way in.
pub struct WorldContext {
    pub renderer: Box<dyn BlockRenderer + Send>,
    pub registry: CanvasRegistry,
}

type WorldTask = Box<dyn FnOnce(&mut WorldContext) + Send>;

enum WorldMessage {
    Task(WorldTask),
    Stop,
}

/// Single-consumer loop standing in for the host's tick thread.
///
/// Graph building and quantization are CPU-bound and run wherever the
/// caller likes; only the Rendered/Destroyed transitions and registry
/// mutation are funneled through this queue.
pub struct WorldLoop {
    tx: Sender<WorldMessage>,
    thread: JoinHandle<()>,
}

/// Cheap handle for submitting tasks from any thread.
#[derive(Clone)]
pub struct WorldHandle {
    tx: Sender<WorldMessage>,
}

impl WorldLoop {
    pub fn spawn(renderer: Box<dyn BlockRenderer + Send>) -> Self {
        let (tx, rx) = unbounded::<WorldMessage>();
        let thread = thread::spawn(move || {
            let mut ctx = WorldContext {
                renderer,
                registry: CanvasRegistry::new(),
            };
            for message in rx {
                match message {
                    WorldMessage::Task(task) => task(&mut ctx),
                    WorldMessage::Stop => break,
                }
            }
            // The server is stopping: tear down whatever is still registered.
            ctx.registry.destroy_all(ctx.renderer.as_mut());
        });
        WorldLoop { tx, thread }
    }

    pub fn handle(&self) -> WorldHandle {
        WorldHandle {
            tx: self.tx.clone(),
        }
    }

    /// Stops the loop after the tasks already queued ahead of the stop
    /// message, then waits for teardown. Outstanding handles see the loop
    /// as stopped once the thread exits.
    pub fn shutdown(self) {
        let _ = self.tx.send(WorldMessage::Stop);
        if self.thread.join().is_err() {
            log::error!("world loop panicked during shutdown");
        }
    }
}

impl WorldHandle {
    /// Enqueues a task; returns false once the loop has stopped.
    pub fn submit(&self, task: impl FnOnce(&mut WorldContext) + Send + 'static) -> bool {
        self.tx.send(WorldMessage::Task(Box::new(task))).is_ok()
    }

    /// Enqueues a task and blocks until the world thread has run it,
    /// returning its result.
    pub fn call<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut WorldContext) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let sent = self.submit(move |ctx| {
            let _ = reply_tx.send(task(ctx));
        });
        if !sent {
            return Err(Error::WorldStopped);
        }
        reply_rx.recv().map_err(|_| Error::WorldStopped)
    }
}
