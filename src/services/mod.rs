pub mod aggregator;
pub mod attribution;
pub mod identity;
pub mod normalizer;
pub mod provider;
pub mod reconciler;
pub mod stores;

pub use aggregator::*;
pub use attribution::*;
pub use identity::*;
pub use normalizer::*;
pub use provider::*;
pub use reconciler::*;
pub use stores::*;
