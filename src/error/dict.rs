use thiserror::Error;

pub type DictResult<T> = Result<T, DictError>;

/// Ошибки операций словаря.
///
/// Все ошибки терминальны: повторный вызов той же операции без изменения
/// состояния словаря вернёт тот же результат.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DictError {
    // ==== Изменение размера ====
    #[error("Incremental rehash already in progress")]
    RehashInProgress,

    #[error("Requested size {requested} is below current occupancy {used}")]
    TargetTooSmall { requested: usize, used: usize },

    #[error("Rehashing to the current table size ({0}) is not useful")]
    SameSize(usize),

    #[error("Resizing is disabled")]
    ResizeDisabled,

    // ==== Ключи ====
    #[error("Key already exists")]
    KeyExists,

    #[error("Key not found")]
    NotFound,
}
