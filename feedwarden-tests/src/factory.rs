mod aggregators;
mod feeds;
mod manifests;

pub use aggregators::*;
pub use feeds::*;
pub use manifests::*;
