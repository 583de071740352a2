mod blocks;
mod classify;
mod extract;
mod linearize;


pub use classify::{LayoutClassifier, LayoutThresholds};
pub use extract::BlockExtractor;
pub use linearize::{LinearDocument, Linearizer, PageErrorPolicy};
