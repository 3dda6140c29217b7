use std::collections::VecDeque;

#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::error::{Error, Result};

/// Render-side end of a command queue. Must never block.
pub trait MessageReceiver<T> {
    fn pop(&mut self) -> Option<T>;
}

/// Control-side end of a command queue.
pub trait MessageSender<T> {
    fn push(&mut self, msg: T) -> Result<()>;
}

#[cfg(feature = "rtrb")]
impl<T> MessageReceiver<T> for Consumer<T> {
    fn pop(&mut self) -> Option<T> {
        Consumer::pop(self).ok()
    }
}

#[cfg(feature = "rtrb")]
impl<T> MessageSender<T> for Producer<T> {
    fn push(&mut self, msg: T) -> Result<()> {
        Producer::push(self, msg).map_err(|_| Error::QueueFull)
    }
}

// Single-threaded queues, mostly for tests and offline rendering.
impl<T> MessageReceiver<T> for VecDeque<T> {
    fn pop(&mut self) -> Option<T> {
        self.pop_front()
    }
}

impl<T> MessageSender<T> for VecDeque<T> {
    fn push(&mut self, msg: T) -> Result<()> {
        self.push_back(msg);
        Ok(())
    }
}
