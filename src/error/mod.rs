//! Модуль, отвечающий за обработку ошибок, возникающих при операциях
//! со словарём.

/// Ошибки операций словаря: изменение размера, конфликты ключей.
pub mod dict;

// Публичный экспорт всех типов ошибок из вложенных модулей,
// чтобы упростить доступ к ним из внешнего кода.
pub use dict::*;
