//! # Lock Lectores/Escritor con Preferencia de Escritores
//! src/log/rwlock.rs
//!
//! `std::sync::RwLock` no garantiza ninguna política de equidad, así que el
//! lock del log se construye a mano como un monitor: un `Mutex` con los
//! contadores y dos `Condvar` (`read_allowed`, `write_allowed`).
//!
//! ## Política
//!
//! - Un lector espera mientras haya escritores activos **o esperando**.
//! - Un escritor se registra como esperando y luego espera a que no haya
//!   nadie adentro.
//!
//! Un escritor registrado bloquea a los lectores nuevos aunque el lock esté
//! libre para lectura. Los escritores no sufren inanición; con tráfico de
//! escritura sostenido los lectores sí pueden sufrirla.
//!
//! El acceso a los datos es por guards RAII: soltar el guard libera el lock.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Contadores de sincronización
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockStats {
    pub active_readers: usize,
    /// 0 o 1
    pub active_writers: usize,
    pub waiting_writers: usize,
}

/// Lock lectores/escritor que protege un valor `T`
pub struct WriterPreferringLock<T> {
    state: Mutex<LockStats>,
    read_allowed: Condvar,
    write_allowed: Condvar,
    data: UnsafeCell<T>,
}

// Los guards solo dan `&T` a varios lectores o `&mut T` a un único escritor,
// igual que `std::sync::RwLock`.
unsafe impl<T: Send> Send for WriterPreferringLock<T> {}
unsafe impl<T: Send + Sync> Sync for WriterPreferringLock<T> {}

impl<T> WriterPreferringLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockStats::default()),
            read_allowed: Condvar::new(),
            write_allowed: Condvar::new(),
            data: UnsafeCell::new(value),
        }
    }

    // Los contadores se actualizan sin código que pueda entrar en pánico.
    fn lock_state(&self) -> MutexGuard<'_, LockStats> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adquiere el lock en modo lectura
    ///
    /// Bloquea mientras haya un escritor activo o esperando.
    pub fn read(&self) -> ReadGuard<'_, T> {
        let mut state = self.lock_state();
        while state.waiting_writers > 0 || state.active_writers > 0 {
            state = self
                .read_allowed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.active_readers += 1;

        ReadGuard { lock: self }
    }

    fn release_read(&self) {
        let mut state = self.lock_state();
        state.active_readers -= 1;
        if state.active_readers == 0 {
            self.write_allowed.notify_one();
        }
    }

    /// Adquiere el lock en modo escritura (exclusivo)
    ///
    /// Se registra como escritor en espera antes de bloquear, lo que frena a
    /// los lectores nuevos.
    pub fn write(&self) -> WriteGuard<'_, T> {
        let mut state = self.lock_state();
        state.waiting_writers += 1;
        while state.active_readers + state.active_writers > 0 {
            state = self
                .write_allowed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.waiting_writers -= 1;
        state.active_writers = 1;

        WriteGuard { lock: self }
    }

    fn release_write(&self) {
        let mut state = self.lock_state();
        state.active_writers = 0;
        self.write_allowed.notify_one();
        self.read_allowed.notify_all();
    }

    /// Copia de los contadores actuales
    pub fn stats(&self) -> LockStats {
        *self.lock_state()
    }

    /// Consume el lock y retorna el valor
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for WriterPreferringLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Acceso compartido; libera el lock de lectura al soltarse
pub struct ReadGuard<'a, T> {
    lock: &'a WriterPreferringLock<T>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Mientras exista el guard no hay escritores activos
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_read();
    }
}

/// Acceso exclusivo; libera el lock de escritura al soltarse
pub struct WriteGuard<'a, T> {
    lock: &'a WriterPreferringLock<T>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // Único escritor y ningún lector mientras exista el guard
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    /// Espera (con tope) a que los contadores cumplan una condición
    fn wait_for(lock: &WriterPreferringLock<u32>, cond: impl Fn(LockStats) -> bool) {
        for _ in 0..200 {
            if cond(lock.stats()) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached: {:?}", lock.stats());
    }

    #[test]
    fn test_readers_share_the_lock() {
        let lock = Arc::new(WriterPreferringLock::new(5u32));
        let barrier = Arc::new(Barrier::new(3));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let lock = Arc::clone(&lock);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let guard = lock.read();
                    // Los tres tienen que estar adentro a la vez para pasar la barrera
                    barrier.wait();
                    *guard
                })
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), 5);
        }
        assert_eq!(lock.stats(), LockStats::default());
    }

    #[test]
    fn test_writer_excludes_readers() {
        let lock = Arc::new(WriterPreferringLock::new(0u32));
        let mut guard = lock.write();
        *guard = 1;

        let read_done = Arc::new(AtomicBool::new(false));
        let reader = thread::spawn({
            let lock = Arc::clone(&lock);
            let read_done = Arc::clone(&read_done);
            move || {
                let value = *lock.read();
                read_done.store(true, Ordering::SeqCst);
                value
            }
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!read_done.load(Ordering::SeqCst));
        let stats = lock.stats();
        assert_eq!(stats.active_writers, 1);
        assert_eq!(stats.active_readers, 0);

        *guard = 2;
        drop(guard);
        assert_eq!(reader.join().unwrap(), 2);
    }

    #[test]
    fn test_waiting_writer_blocks_new_readers() {
        let lock = Arc::new(WriterPreferringLock::new(0u32));
        let order = Arc::new(Mutex::new(Vec::new()));

        let first_reader = lock.read();

        let writer = thread::spawn({
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            move || {
                let mut guard = lock.write();
                *guard += 1;
                order.lock().unwrap().push("writer");
            }
        });
        wait_for(&lock, |s| s.waiting_writers == 1);

        let late_reader = thread::spawn({
            let lock = Arc::clone(&lock);
            let order = Arc::clone(&order);
            move || {
                let value = *lock.read();
                order.lock().unwrap().push("reader");
                value
            }
        });

        // El lector nuevo no entra aunque solo haya lectores adentro
        thread::sleep(Duration::from_millis(50));
        assert_eq!(lock.stats().active_readers, 1);
        assert!(order.lock().unwrap().is_empty());

        drop(first_reader);
        writer.join().unwrap();
        assert_eq!(late_reader.join().unwrap(), 1);
        assert_eq!(*order.lock().unwrap(), vec!["writer", "reader"]);
    }

    #[test]
    fn test_mutual_exclusion_under_contention() {
        let lock = Arc::new(WriterPreferringLock::new(0u64));
        let readers_inside = Arc::new(AtomicUsize::new(0));
        let writers_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let lock = Arc::clone(&lock);
                let readers_inside = Arc::clone(&readers_inside);
                let writers_inside = Arc::clone(&writers_inside);
                thread::spawn(move || {
                    for _ in 0..200 {
                        if i % 2 == 0 {
                            let mut guard = lock.write();
                            assert_eq!(writers_inside.fetch_add(1, Ordering::SeqCst), 0);
                            assert_eq!(readers_inside.load(Ordering::SeqCst), 0);
                            *guard += 1;
                            writers_inside.fetch_sub(1, Ordering::SeqCst);
                        } else {
                            let _guard = lock.read();
                            readers_inside.fetch_add(1, Ordering::SeqCst);
                            assert_eq!(writers_inside.load(Ordering::SeqCst), 0);
                            readers_inside.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*lock.read(), 4 * 200);
        assert_eq!(lock.stats(), LockStats::default());
    }

    #[test]
    fn test_into_inner() {
        let lock = WriterPreferringLock::new(vec![1, 2]);
        lock.write().push(3);
        assert_eq!(lock.into_inner(), vec![1, 2, 3]);
    }
}
