mod client;
mod dashboard;
mod integrity;
mod invoice;
mod item;
mod money;

pub use client::*;
pub use dashboard::*;
pub use integrity::*;
pub use invoice::*;
pub use item::*;
pub use money::*;
