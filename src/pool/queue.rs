//! # Cola Acotada de Requests
//! src/pool/queue.rs
//!
//! Cola FIFO thread-safe de capacidad fija entre el acceptor (productor) y los
//! workers (consumidores). Es un monitor: un `Mutex` más dos `Condvar`
//! (`not_empty`, `not_full`). Nadie hace polling; los que esperan duermen en la
//! condvar y vuelven a chequear el predicado al despertar.
//!
//! ## Cierre
//!
//! `close()` despierta a todos los que esperan. Después del cierre `enqueue`
//! devuelve el item rechazado y `dequeue` sigue entregando lo que quedó en la cola
//! hasta vaciarla; recién entonces reporta `Closed`.

use crate::error::QueueError;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Estado protegido por el mutex
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct QueueInner<T> {
    state: Mutex<QueueState<T>>,

    /// Se señala cuando la cola deja de estar vacía
    not_empty: Condvar,

    /// Se señala cuando la cola deja de estar llena
    not_full: Condvar,

    capacity: usize,
}

/// Cola acotada compartida entre el dispatch loop y el pool de workers
pub struct RequestQueue<T> {
    inner: Arc<QueueInner<T>>,
}

impl<T> RequestQueue<T> {
    /// Crea una cola vacía con capacidad fija
    ///
    /// # Panics
    ///
    /// Si `capacity` es 0 (la configuración ya lo valida antes).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be >= 1");

        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState {
                    items: VecDeque::with_capacity(capacity),
                    closed: false,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
                capacity,
            }),
        }
    }

    // Ningún camino entra en pánico con el lock tomado dejando el estado a medias,
    // así que un lock envenenado se puede seguir usando.
    fn lock_state(&self) -> MutexGuard<'_, QueueState<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola un item al final
    ///
    /// Bloquea mientras la cola esté llena. Si la cola estaba vacía despierta a
    /// un consumidor.
    ///
    /// # Errores
    ///
    /// * `QueueError::Closed(Some(item))` - la cola fue cerrada
    /// * `QueueError::Allocation(item)` - no se pudo reservar memoria; la cola no cambia
    pub fn enqueue(&self, item: T) -> Result<(), QueueError<T>> {
        let mut state = self.lock_state();

        while state.items.len() == self.inner.capacity && !state.closed {
            state = self
                .inner
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if state.closed {
            return Err(QueueError::Closed(Some(item)));
        }

        if state.items.try_reserve(1).is_err() {
            return Err(QueueError::Allocation(item));
        }

        let was_empty = state.items.is_empty();
        state.items.push_back(item);

        if was_empty {
            self.inner.not_empty.notify_one();
        }
        // Otro productor puede estar esperando el hueco que sobra
        if state.items.len() < self.inner.capacity {
            self.inner.not_full.notify_one();
        }

        Ok(())
    }

    /// Desencola el item más antiguo
    ///
    /// Bloquea mientras la cola esté vacía. Si la cola estaba llena despierta a
    /// un productor.
    ///
    /// # Errores
    ///
    /// * `QueueError::Closed(None)` - la cola está cerrada y ya no quedan items
    pub fn dequeue(&self) -> Result<T, QueueError<T>> {
        let mut state = self.lock_state();

        while state.items.is_empty() && !state.closed {
            state = self
                .inner
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let was_full = state.items.len() == self.inner.capacity;
        let item = match state.items.pop_front() {
            Some(item) => item,
            None => return Err(QueueError::Closed(None)),
        };

        if was_full {
            self.inner.not_full.notify_one();
        }
        // Quedan items: pasar la posta a otro consumidor dormido
        if !state.items.is_empty() {
            self.inner.not_empty.notify_one();
        }

        Ok(item)
    }

    /// Cierra la cola y despierta a todos los que esperan
    ///
    /// Es idempotente.
    pub fn close(&self) {
        let mut state = self.lock_state();
        state.closed = true;
        drop(state);

        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    /// Indica si la cola fue cerrada
    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    /// Retorna el tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.lock_state().items.len()
    }

    /// Verifica si la cola está vacía
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verifica si la cola está llena
    pub fn is_full(&self) -> bool {
        self.len() >= self.inner.capacity
    }

    /// Retorna la capacidad máxima
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

// Manual para no exigir `T: Clone`: se clona el handle, no los items
impl<T> Clone for RequestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = RequestQueue::new(8);

        for i in 0..8 {
            queue.enqueue(i).unwrap();
        }

        let out: Vec<i32> = (0..8).map(|_| queue.dequeue().unwrap()).collect();
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5, 6, 7]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_capacity_one_blocks_second_enqueue() {
        let queue = RequestQueue::new(1);
        queue.enqueue("A").unwrap();
        assert!(queue.is_full());

        let done = Arc::new(AtomicBool::new(false));
        let producer = thread::spawn({
            let queue = queue.clone();
            let done = Arc::clone(&done);
            move || {
                queue.enqueue("B").unwrap();
                done.store(true, Ordering::SeqCst);
            }
        });

        // El segundo enqueue debe seguir bloqueado
        thread::sleep(Duration::from_millis(100));
        assert!(!done.load(Ordering::SeqCst));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.dequeue().unwrap(), "A");
        producer.join().unwrap();
        assert!(done.load(Ordering::SeqCst));

        assert_eq!(queue.dequeue().unwrap(), "B");
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue: RequestQueue<u32> = RequestQueue::new(4);
        let got = Arc::new(AtomicBool::new(false));

        let consumer = thread::spawn({
            let queue = queue.clone();
            let got = Arc::clone(&got);
            move || {
                let item = queue.dequeue().unwrap();
                got.store(true, Ordering::SeqCst);
                item
            }
        });

        thread::sleep(Duration::from_millis(100));
        assert!(!got.load(Ordering::SeqCst));

        queue.enqueue(42).unwrap();
        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn test_close_wakes_blocked_consumers() {
        let queue: RequestQueue<u32> = RequestQueue::new(2);

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.dequeue())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        queue.close();

        for consumer in consumers {
            let result = consumer.join().unwrap();
            assert!(matches!(result, Err(QueueError::Closed(None))));
        }
    }

    #[test]
    fn test_close_wakes_blocked_producer() {
        let queue = RequestQueue::new(1);
        queue.enqueue(1).unwrap();

        let producer = thread::spawn({
            let queue = queue.clone();
            move || queue.enqueue(2)
        });

        thread::sleep(Duration::from_millis(50));
        queue.close();

        let result = producer.join().unwrap();
        assert_eq!(result.unwrap_err().into_item(), Some(2));
    }

    #[test]
    fn test_drains_remaining_items_after_close() {
        let queue = RequestQueue::new(4);
        queue.enqueue(1).unwrap();
        queue.enqueue(2).unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert!(queue.enqueue(3).unwrap_err().is_closed());
        assert_eq!(queue.dequeue().unwrap(), 1);
        assert_eq!(queue.dequeue().unwrap(), 2);
        assert!(queue.dequeue().unwrap_err().is_closed());
    }

    #[test]
    fn test_many_producers_and_consumers_lose_nothing() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 250;
        const CAPACITY: usize = 3;

        let queue = RequestQueue::new(CAPACITY);
        let max_seen = Arc::new(AtomicUsize::new(0));

        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    let mut got = Vec::new();
                    loop {
                        max_seen.fetch_max(queue.len(), Ordering::SeqCst);
                        match queue.dequeue() {
                            Ok(item) => got.push(item),
                            Err(_) => break,
                        }
                    }
                    got
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.enqueue(p * PER_PRODUCER + i).unwrap();
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        queue.close();

        let mut all: Vec<usize> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();
        all.sort_unstable();

        assert_eq!(all, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
        assert!(max_seen.load(Ordering::SeqCst) <= CAPACITY);
    }

    #[test]
    fn test_single_producer_order_seen_by_single_consumer() {
        let queue = RequestQueue::new(2);

        let consumer = thread::spawn({
            let queue = queue.clone();
            move || (0..100).map(|_| queue.dequeue().unwrap()).collect::<Vec<u32>>()
        });

        for i in 0..100 {
            queue.enqueue(i).unwrap();
        }

        assert_eq!(consumer.join().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "queue capacity must be >= 1")]
    fn test_zero_capacity_panics() {
        let _ = RequestQueue::<u8>::new(0);
    }
}
