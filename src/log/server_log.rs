//! # Log Compartido de Solo-Agregado
//! src/log/server_log.rs
//!
//! Secuencia no acotada de registros de bytes. Cada worker agrega un registro por
//! request completado; el handler de volcado (POST) lee todo el contenido.
//!
//! Los registros viven en un `Vec` dentro del lock lectores/escritor: el orden de
//! inserción es exactamente el orden de admisión de los escritores.

use super::rwlock::{LockStats, WriterPreferringLock};
use crate::error::LogError;

/// Registro inmutable del log
///
/// Se crea una sola vez al agregarlo y no se modifica nunca.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    data: Box<[u8]>,
}

impl LogRecord {
    /// Copia `data` a un registro nuevo, reportando si no hay memoria
    fn try_from_slice(data: &[u8]) -> Result<Self, LogError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(data.len())
            .map_err(|_| LogError::Allocation(data.len()))?;
        buf.extend_from_slice(data);

        Ok(Self {
            data: buf.into_boxed_slice(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Siempre `false`: el log rechaza registros vacíos
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Log compartido del servidor
#[derive(Default)]
pub struct ServerLog {
    records: WriterPreferringLock<Vec<LogRecord>>,
}

impl ServerLog {
    /// Crea un log vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un registro al final del log
    ///
    /// Toma el lock de escritura solo para enlazar el registro ya copiado.
    ///
    /// # Errores
    ///
    /// * `LogError::EmptyRecord` - `data` vacío; se rechaza sin tomar el lock
    /// * `LogError::Allocation` - sin memoria; el log queda igual
    pub fn append(&self, data: &[u8]) -> Result<(), LogError> {
        if data.is_empty() {
            return Err(LogError::EmptyRecord);
        }

        let record = LogRecord::try_from_slice(data)?;

        let mut records = self.records.write();
        reserve_slot(&mut *records, data.len())?;
        records.push(record);

        Ok(())
    }

    /// Concatena todos los registros en orden de inserción
    ///
    /// El resultado refleja exactamente los registros agregados antes de que se
    /// concediera el lock de lectura; nunca incluye un registro a medias.
    ///
    /// # Errores
    ///
    /// * `LogError::Allocation` - no se pudo reservar el buffer de salida
    pub fn snapshot(&self) -> Result<Vec<u8>, LogError> {
        let records = self.records.read();

        let total: usize = records.iter().map(LogRecord::len).sum();
        let mut buf = Vec::new();
        buf.try_reserve_exact(total)
            .map_err(|_| LogError::Allocation(total))?;

        for record in records.iter() {
            buf.extend_from_slice(record.as_bytes());
        }

        Ok(buf)
    }

    /// Cantidad de registros
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contadores del lock (para diagnóstico y tests)
    pub fn lock_stats(&self) -> LockStats {
        self.records.stats()
    }
}

/// Reserva lugar para un registro más; el error informa el tamaño del registro
fn reserve_slot<T>(records: &mut Vec<T>, record_len: usize) -> Result<(), LogError> {
    records
        .try_reserve(1)
        .map_err(|_| LogError::Allocation(record_len))
}
