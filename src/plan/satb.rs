//! SATB buffers.
//!
//! Each mutator owns a thread-local [`SatbBuffer`] so that recording an object on a pointer
//! write never takes a shared lock. When a buffer fills up it is published as a completed
//! buffer to the shared [`SatbQueue`], from which the concurrent tracer consumes the recorded
//! objects. Only that hand-off synchronizes across threads.

use std::sync::Arc;

use crossbeam::queue::SegQueue;

use crate::util::options::Options;
use crate::util::ObjectReference;

/// The per-thread context a barrier records objects into.
///
/// Barriers never look up the current mutator themselves. The caller passes its context to
/// every barrier operation that may record, which makes the dependency visible and lets tests
/// inject their own recorder.
pub trait MutatorContext {
    /// Push `object` into the SATB buffer of this mutator. `object` is never null and never
    /// carries the weak tag.
    fn remember_object_in_satb_buffer(&mut self, object: ObjectReference);
}

/// A thread-local buffer of recorded objects.
pub struct SatbBuffer {
    /// Recorded objects.
    buffer: Vec<ObjectReference>,
    /// The number of objects to buffer before the buffer is considered full.
    capacity: usize,
}

impl SatbBuffer {
    /// Create an empty buffer. Memory is reserved on the first push.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            buffer: Vec::new(),
            capacity,
        }
    }

    /// Return `true` if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The number of buffered objects.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer size reaches its capacity.
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    #[inline(always)]
    pub fn push(&mut self, object: ObjectReference) {
        if self.buffer.is_empty() {
            self.buffer.reserve(self.capacity);
        }
        self.buffer.push(object);
    }

    /// Return the contents of the buffer. It will empty the buffer.
    pub fn take(&mut self) -> Vec<ObjectReference> {
        std::mem::take(&mut self.buffer)
    }

    /// The buffered objects in the order they were recorded.
    pub fn as_slice(&self) -> &[ObjectReference] {
        &self.buffer
    }
}

/// The queue of completed SATB buffers, shared by all mutators and the collector.
#[derive(Default)]
pub struct SatbQueue {
    buffers: SegQueue<Vec<ObjectReference>>,
}

impl SatbQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a completed buffer. Empty buffers are dropped.
    pub fn publish(&self, buffer: Vec<ObjectReference>) {
        if !buffer.is_empty() {
            self.buffers.push(buffer);
        }
    }

    /// Take one completed buffer, if there is any.
    pub fn pop_buffer(&self) -> Option<Vec<ObjectReference>> {
        self.buffers.pop()
    }

    /// Move the objects of all completed buffers into `objects`. Returns the number of
    /// objects moved.
    pub fn drain_into(&self, objects: &mut Vec<ObjectReference>) -> usize {
        let mut n = 0;
        while let Some(mut buffer) = self.buffers.pop() {
            n += buffer.len();
            objects.append(&mut buffer);
        }
        n
    }

    /// The number of completed buffers.
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Return `true` if there is no completed buffer.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// A mutator's SATB state: a thread-local buffer and the shared queue it publishes to.
pub struct Mutator {
    buffer: SatbBuffer,
    queue: Arc<SatbQueue>,
}

impl Mutator {
    /// Create a mutator with the buffer capacity from the options.
    pub fn new(queue: Arc<SatbQueue>, options: &Options) -> Self {
        Self::with_capacity(queue, options.satb_buffer_capacity)
    }

    /// Create a mutator with a specific buffer capacity.
    pub fn with_capacity(queue: Arc<SatbQueue>, capacity: usize) -> Self {
        Self {
            buffer: SatbBuffer::new(capacity),
            queue,
        }
    }

    /// Publish the partially filled buffer to the shared queue.
    #[cold]
    pub fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let buffer = self.buffer.take();
            debug!("Publish a SATB buffer of {} objects", buffer.len());
            probe::probe!(satb_barriers, satb_flush, buffer.len());
            self.queue.publish(buffer);
        }
    }

    /// The objects recorded by this mutator that have not been published yet.
    pub fn buffered(&self) -> &[ObjectReference] {
        self.buffer.as_slice()
    }

    /// The shared queue this mutator publishes to.
    pub fn queue(&self) -> &Arc<SatbQueue> {
        &self.queue
    }
}

impl MutatorContext for Mutator {
    #[inline(always)]
    fn remember_object_in_satb_buffer(&mut self, object: ObjectReference) {
        debug_assert!(!object.is_null(), "Null object pushed into a SATB buffer");
        debug_assert!(
            !crate::util::tagged::is_weak(object.value()),
            "Weak tagged word {} pushed into a SATB buffer",
            object
        );
        self.buffer.push(object);
        if self.buffer.is_full() {
            self.flush();
        }
    }
}

impl Drop for Mutator {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Address;

    fn obj(raw: usize) -> ObjectReference {
        ObjectReference::from_raw_address(unsafe { Address::from_usize(raw) })
    }

    #[test]
    fn buffer_publishes_when_full() {
        let queue = Arc::new(SatbQueue::new());
        let mut mutator = Mutator::with_capacity(queue.clone(), 2);
        mutator.remember_object_in_satb_buffer(obj(0x1000));
        assert!(queue.is_empty());
        assert_eq!(mutator.buffered(), &[obj(0x1000)]);
        mutator.remember_object_in_satb_buffer(obj(0x2000));
        assert_eq!(queue.num_buffers(), 1);
        assert!(mutator.buffered().is_empty());
        assert_eq!(queue.pop_buffer().unwrap(), vec![obj(0x1000), obj(0x2000)]);
    }

    #[test]
    fn flush_on_drop() {
        let queue = Arc::new(SatbQueue::new());
        {
            let mut mutator = Mutator::with_capacity(queue.clone(), 16);
            mutator.remember_object_in_satb_buffer(obj(0x1000));
        }
        let mut objects = vec![];
        assert_eq!(queue.drain_into(&mut objects), 1);
        assert_eq!(objects, vec![obj(0x1000)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_buffers_are_not_published() {
        let queue = Arc::new(SatbQueue::new());
        let mut mutator = Mutator::with_capacity(queue.clone(), 16);
        mutator.flush();
        queue.publish(vec![]);
        assert!(queue.is_empty());
    }

    #[test]
    fn mutators_on_many_threads() {
        let queue = Arc::new(SatbQueue::new());
        let handles: Vec<_> = (0..4usize)
            .map(|t| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    let mut mutator = Mutator::with_capacity(queue, 7);
                    for i in 0..100usize {
                        mutator.remember_object_in_satb_buffer(obj(0x10_0000 * (t + 1) + i * 8));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut objects = vec![];
        assert_eq!(queue.drain_into(&mut objects), 400);
        objects.sort();
        objects.dedup();
        assert_eq!(objects.len(), 400);
    }
}
