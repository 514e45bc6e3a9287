//! Подсистема Publish–Subscribe: сэмплы, слушатели, таблица подписок и
//! маршрутизация.
//!
//! - `sample`: единица публикации, логические часы и флаг жизни сессии.
//! - `listener`: трейт слушателя и канальный слушатель с ограниченной
//!   очередью.
//! - `table`: потокобезопасный реестр подписок со снимками для чтения.
//! - `router`: доставка сэмпла всем подходящим слушателям с изоляцией
//!   отказов.

pub mod listener;
pub mod router;
pub mod sample;
pub mod table;

pub use listener::*;
pub use router::*;
pub use sample::*;
pub use table::*;
